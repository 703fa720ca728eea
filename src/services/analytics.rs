//! CSV rendering of a project's analytics summary.

use anyhow::{anyhow, Context, Result};
use csv::{Terminator, Writer, WriterBuilder};

use crate::domain::AnalyticsSummary;

fn writer(buf: Vec<u8>) -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(buf)
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// `metric,value` rows, a blank line, then `event_type,count` rows.
pub fn export_csv(summary: &AnalyticsSummary) -> Result<String> {
    let event_counts =
        serde_json::to_string(&summary.event_counts).context("Failed to encode event counts")?;

    let mut wtr = writer(Vec::new());
    wtr.write_record(["metric", "value"])?;
    wtr.write_record(["event_counts", event_counts.as_str()])?;
    wtr.write_record(["responses_count", summary.responses_count.to_string().as_str()])?;
    wtr.write_record(["avg_confidence", opt(summary.avg_confidence).as_str()])?;
    wtr.write_record(["feedback_count", summary.feedback_count.to_string().as_str()])?;
    wtr.write_record(["avg_rating", opt(summary.avg_rating).as_str()])?;
    let mut buf = wtr.into_inner().map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))?;

    buf.extend_from_slice(b"\r\n");

    let mut wtr = writer(buf);
    wtr.write_record(["event_type", "count"])?;
    for (event_type, count) in &summary.event_counts {
        wtr.write_record([event_type.as_str(), count.to_string().as_str()])?;
    }
    let buf = wtr.into_inner().map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))?;

    String::from_utf8(buf).context("CSV output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_both_sections() {
        let mut summary = AnalyticsSummary {
            responses_count: 2,
            avg_confidence: Some(0.5),
            ..Default::default()
        };
        summary.event_counts.insert("message_sent".into(), 3);
        summary.event_counts.insert("lead_created".into(), 1);

        let csv = export_csv(&summary).unwrap();
        let expected = concat!(
            "metric,value\r\n",
            "event_counts,\"{\"\"lead_created\"\":1,\"\"message_sent\"\":3}\"\r\n",
            "responses_count,2\r\n",
            "avg_confidence,0.5\r\n",
            "feedback_count,0\r\n",
            "avg_rating,\r\n",
            "\r\n",
            "event_type,count\r\n",
            "lead_created,1\r\n",
            "message_sent,3\r\n",
        );
        assert_eq!(csv, expected);
    }

    #[test]
    fn empty_summary_has_headers_only_in_second_section() {
        let csv = export_csv(&AnalyticsSummary::default()).unwrap();
        assert!(csv.ends_with("\r\n\r\nevent_type,count\r\n"));
        assert!(csv.contains("event_counts,{}\r\n"));
    }
}
