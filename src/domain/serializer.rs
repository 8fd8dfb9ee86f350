use crate::domain::models::VirtualSpan;
use chrono::{Datelike, Weekday};
use chrono_tz::Tz;

fn weekday_glyph(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// Renders one span as `8月3日(日) 09:00〜10:30` in `tz`.
pub fn format_span_line(span: &VirtualSpan, tz: &Tz) -> String {
    let start = span.start.with_timezone(tz);
    let end = span.end.with_timezone(tz);
    format!(
        "{}月{}日({}) {}〜{}",
        start.month(),
        start.day(),
        weekday_glyph(start.weekday()),
        start.format("%H:%M"),
        end.format("%H:%M")
    )
}

/// Copy-ready listing of `spans`, earliest start first.
///
/// The sort is stable, so spans sharing a start keep their input order.
pub fn format_selection_text(spans: &[VirtualSpan], tz: &Tz) -> String {
    let mut sorted: Vec<&VirtualSpan> = spans.iter().collect();
    sorted.sort_by_key(|span| span.start);
    sorted
        .into_iter()
        .map(|span| format_span_line(span, tz))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use chrono_tz::Asia::Tokyo;
    use proptest::prelude::*;

    fn tokyo(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Tokyo
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("unambiguous local time")
            .with_timezone(&Utc)
    }

    fn span(start: DateTime<Utc>, end: DateTime<Utc>) -> VirtualSpan {
        VirtualSpan::new(start, end).expect("valid span")
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(format_selection_text(&[], &Tokyo), "");
    }

    #[test]
    fn earlier_span_is_listed_first() {
        let spans = vec![
            span(tokyo(2025, 8, 3, 9, 0), tokyo(2025, 8, 3, 10, 30)),
            span(tokyo(2025, 8, 3, 8, 0), tokyo(2025, 8, 3, 8, 30)),
        ];
        assert_eq!(
            format_selection_text(&spans, &Tokyo),
            "8月3日(日) 08:00〜08:30\n8月3日(日) 09:00〜10:30"
        );
    }

    #[test]
    fn weekday_and_month_follow_display_timezone() {
        // 00:30 on Jan 1 in Tokyo is still Dec 31 in UTC
        let line = format_span_line(
            &span(tokyo(2026, 1, 1, 0, 30), tokyo(2026, 1, 1, 1, 0)),
            &Tokyo,
        );
        assert_eq!(line, "1月1日(木) 00:30〜01:00");

        let utc_line = format_span_line(
            &span(tokyo(2026, 1, 1, 0, 30), tokyo(2026, 1, 1, 1, 0)),
            &chrono_tz::UTC,
        );
        assert_eq!(utc_line, "12月31日(水) 15:30〜16:00");
    }

    #[test]
    fn span_crossing_midnight_prints_only_end_time() {
        let line = format_span_line(
            &span(tokyo(2025, 8, 9, 23, 0), tokyo(2025, 8, 10, 1, 0)),
            &Tokyo,
        );
        assert_eq!(line, "8月9日(土) 23:00〜01:00");
    }

    #[test]
    fn equal_starts_keep_input_order() {
        let first = span(tokyo(2025, 8, 4, 9, 0), tokyo(2025, 8, 4, 11, 0));
        let second = span(tokyo(2025, 8, 4, 9, 0), tokyo(2025, 8, 4, 10, 0));
        let text = format_selection_text(&[first.clone(), second.clone()], &Tokyo);
        assert_eq!(text, "8月4日(月) 09:00〜11:00\n8月4日(月) 09:00〜10:00");

        let reversed = format_selection_text(&[second, first], &Tokyo);
        assert_eq!(reversed, "8月4日(月) 09:00〜10:00\n8月4日(月) 09:00〜11:00");
    }

    proptest! {
        #[test]
        fn one_sorted_line_per_span(
            offsets in prop::collection::vec((0i64..10_000i64, 1i64..600i64), 1..20)
        ) {
            let base = tokyo(2025, 8, 1, 0, 0);
            let spans: Vec<VirtualSpan> = offsets
                .iter()
                .map(|(start, length)| {
                    let start = base + chrono::Duration::minutes(*start);
                    span(start, start + chrono::Duration::minutes(*length))
                })
                .collect();

            let text = format_selection_text(&spans, &Tokyo);
            let lines: Vec<&str> = text.split('\n').collect();
            prop_assert_eq!(lines.len(), spans.len());
            prop_assert!(!text.ends_with('\n'));

            let mut sorted = spans.clone();
            sorted.sort_by_key(|span| span.start);
            for (line, span) in lines.iter().zip(sorted.iter()) {
                prop_assert_eq!(*line, format_span_line(span, &Tokyo));
            }
        }
    }
}
