#[cfg(test)]
mod tests {
    use crate::aggregation::{AggregateMode, BucketMode};
    use crate::error::{Error, ParseError, Result};
    use crate::interval::RoundUnit;
    use crate::reader::ErrorPolicy;
    use crate::record::{Record, TIMESTAMP_FORMAT};
    use crate::sink::{Clock, DelimitedWriter, Plotter, RowSink};
    use crate::tracker::Tracker;
    use chrono::NaiveDateTime;
    use mockall::*;
    use std::io;

    mock! {
        pub Clock {}
        impl Clock for Clock {
            fn now(&self) -> NaiveDateTime;
        }
    }

    mock! {
        pub Sink {}
        impl RowSink for Sink {
            fn write_row(&mut self, row: &[String]) -> Result<()>;
        }
    }

    mock! {
        pub Plotter {}
        impl Plotter for Plotter {
            fn render(&self, values: &[f64]) -> String;
        }
    }

    const LOG: &str = "\
2024-01-01 22:00:00\tsleep\t1\n\
2024-01-02 07:30:00\tpulse\t58\trest\n\
2024-01-02 07:45:00\tweight\t81.2\n\
2024-01-02 12:00:00\tpulse\t72\n\
2024-01-02 23:00:00\tsleep\t1\n\
2024-01-03 08:00:00\tpulse\t61\t\tafter coffee\n\
2024-01-03 22:30:00\tsleep\t1\n\
2024-01-03 08:10:00\tweight\t80.9\n";

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn clock_at(at: &'static str) -> Box<MockClock> {
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || ts(at));
        Box::new(clock)
    }

    fn tracker() -> Tracker {
        Tracker::with_clock('\t', ErrorPolicy::Abort, clock_at("2024-01-04 10:30:00"))
    }

    #[tokio::test]
    async fn test_filter_passthrough_keeps_full_records() {
        let rows = tracker()
            .filter_rows(LOG.as_bytes(), "pulse", BucketMode::None, AggregateMode::Average)
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                vec!["2024-01-02 07:30:00", "pulse", "58.000", "rest"],
                vec!["2024-01-02 12:00:00", "pulse", "72.000"],
                vec!["2024-01-03 08:00:00", "pulse", "61.000", "", "after coffee"],
            ]
        );
    }

    #[tokio::test]
    async fn test_filter_daily_average() {
        let rows = tracker()
            .filter_rows(LOG.as_bytes(), "pulse", BucketMode::Daily, AggregateMode::Average)
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                vec!["2024-01-02", "pulse", "65.000"],
                vec!["2024-01-03", "pulse", "61.000"],
            ]
        );
    }

    #[tokio::test]
    async fn test_filter_total_sum() {
        let rows = tracker()
            .filter_rows(LOG.as_bytes(), "pulse", BucketMode::Total, AggregateMode::Sum)
            .await
            .unwrap();
        assert_eq!(rows, vec![vec!["total", "pulse", "191.000"]]);
    }

    #[tokio::test]
    async fn test_interval_rows_for_sleep() {
        let rows = tracker()
            .interval_rows(LOG.as_bytes(), "sleep", RoundUnit::Hours)
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![
                vec!["2024-01-02 23:00:00", "sleep", "25.000"],
                vec!["2024-01-03 22:30:00", "sleep", "23.500"],
                vec!["2024-01-03 22:30:00", "sleep", "12.000"],
            ]
        );
    }

    #[tokio::test]
    async fn test_interval_without_matches_is_empty() {
        let rows = tracker()
            .interval_rows(LOG.as_bytes(), "steps", RoundUnit::Seconds)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_latest_one_row_per_measurement() {
        let rows = tracker().latest_rows(LOG.as_bytes()).await.unwrap();

        assert_eq!(
            rows,
            vec![
                vec!["2024-01-03 08:00:00", "1d ago", "pulse", "61.000", "", "after coffee"],
                vec!["2024-01-03 22:30:00", "12h ago", "sleep", "1.000"],
                vec!["2024-01-03 08:10:00", "1d ago", "weight", "80.900"],
            ]
        );
    }

    #[tokio::test]
    async fn test_latest_ignores_out_of_order_older_lines() {
        let log = "2024-01-02 00:00:00\tweight\t80\n2024-01-01 00:00:00\tweight\t90\n";
        let rows = tracker().latest_rows(log.as_bytes()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][3], "80.000");
    }

    #[tokio::test]
    async fn test_measurements_are_distinct() {
        let names = tracker().measurements(LOG.as_bytes()).await.unwrap();
        let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["pulse", "sleep", "weight"]);
    }

    #[tokio::test]
    async fn test_series_values_feed_plotter() {
        let tracker = tracker();
        assert_eq!(
            tracker.series_values(LOG.as_bytes(), "weight").await.unwrap(),
            vec![81.2, 80.9]
        );

        let mut plotter = MockPlotter::new();
        plotter
            .expect_render()
            .withf(|values| values.to_vec() == vec![58.0, 72.0, 61.0])
            .times(1)
            .returning(|_| "▁█▂".to_string());

        let picture = tracker.plot(LOG.as_bytes(), "pulse", &plotter).await.unwrap();
        assert_eq!(picture.as_deref(), Some("▁█▂"));

        let nothing = tracker.plot(LOG.as_bytes(), "steps", &plotter).await.unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_plot_returns_multi_line_picture_unchanged() {
        let mut plotter = MockPlotter::new();
        plotter
            .expect_render()
            .withf(|values| values.to_vec() == vec![81.2, 80.9])
            .times(1)
            .returning(|_| " 81.20 ┤╮\n 80.90 ┤╰\n        weight".to_string());

        let picture = tracker()
            .plot(LOG.as_bytes(), "weight", &plotter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picture.lines().count(), 3);
        assert!(picture.ends_with("weight"));
    }

    #[tokio::test]
    async fn test_abort_policy_surfaces_bad_line() {
        let log = "2024-01-01 00:00:00\tpulse\t60\nnot a record\n2024-01-01 01:00:00\tpulse\t70\n";
        let result = tracker()
            .filter_rows(log.as_bytes(), "pulse", BucketMode::Total, AggregateMode::Sum)
            .await;

        match result {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_bad_line() {
        let log = "2024-01-01 00:00:00\tpulse\t60\nnot a record\n2024-01-01 01:00:00\tpulse\t70\n";
        let tracker = Tracker::with_clock('\t', ErrorPolicy::Skip, clock_at("2024-01-02 00:00:00"));
        let rows = tracker
            .filter_rows(log.as_bytes(), "pulse", BucketMode::Total, AggregateMode::Sum)
            .await
            .unwrap();
        assert_eq!(rows, vec![vec!["total", "pulse", "130.000"]]);
    }

    #[tokio::test]
    async fn test_read_error_is_fatal() {
        let mock = tokio_test::io::Builder::new()
            .read(b"2024-01-01 00:00:00\tpulse\t60\n")
            .read_error(io::Error::new(io::ErrorKind::Other, "device lost"))
            .build();

        let tracker = Tracker::with_clock('\t', ErrorPolicy::Skip, clock_at("2024-01-02 00:00:00"));
        let result = tracker.series_values(mock, "pulse").await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_sink_failure_aborts_after_flushed_rows() {
        let mut calls = 0;
        let mut sink = MockSink::new();
        sink.expect_write_row().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
            }
        });

        let result = tracker()
            .filter(LOG.as_bytes(), "pulse", BucketMode::None, AggregateMode::Average, &mut sink)
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_interval_final_row_uses_clock() {
        let mut clock = MockClock::new();
        clock
            .expect_now()
            .times(1)
            .returning(|| ts("2024-01-01 00:10:00"));
        let tracker = Tracker::with_clock(',', ErrorPolicy::Abort, Box::new(clock));

        let rows = tracker
            .interval_rows("2024-01-01 00:00:00,nap,1\n".as_bytes(), "nap", RoundUnit::Minutes)
            .await
            .unwrap();
        assert_eq!(rows, vec![vec!["2024-01-01 00:00:00", "nap", "10.000"]]);
    }

    #[test]
    fn test_append_writes_delimited_line() {
        let tracker = tracker();
        let mut writer = DelimitedWriter::new(Vec::new(), '\t');
        let record = Record::new(ts("2024-01-05 06:00:00"), "weight", 80.25, "", "").unwrap();

        tracker.append(&record, &mut writer).unwrap();
        writer.flush().unwrap();

        let written = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(written, "2024-01-05 06:00:00\tweight\t80.250\n");
    }

    #[tokio::test]
    async fn test_append_refuses_fields_that_would_split_the_line() {
        let tracker = tracker();
        let mut writer = DelimitedWriter::new(Vec::new(), '\t');

        let multiline = Record::new(ts("2024-01-05 06:00:00"), "weight", 80.0, "", "line1\nline2");
        assert!(matches!(
            multiline,
            Err(ParseError::ForbiddenCharacter { found: '\n', .. })
        ));

        let tabbed = Record::new(ts("2024-01-05 06:00:00"), "weight", 80.0, "a\tb", "desc").unwrap();
        match tracker.append(&tabbed, &mut writer) {
            Err(Error::Record(ParseError::ForbiddenCharacter { field, found })) => {
                assert_eq!(field, "name");
                assert_eq!(found, '\t');
            }
            other => panic!("expected rejected record, got {:?}", other),
        }

        let valid = Record::new(ts("2024-01-05 07:00:00"), "weight", 79.5, "a b", "desc").unwrap();
        tracker.append(&valid, &mut writer).unwrap();

        let bytes = writer.into_inner();
        let rows = tracker
            .filter_rows(io::Cursor::new(bytes), "weight", BucketMode::None, AggregateMode::Average)
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![vec!["2024-01-05 07:00:00", "weight", "79.500", "a b", "desc"]]
        );
    }

    #[tokio::test]
    async fn test_appended_lines_read_back() {
        let tracker = tracker();
        let mut writer = DelimitedWriter::new(Vec::new(), '\t');
        for (at, value) in [("2024-01-05 06:00:00", -3.5), ("2024-01-05 07:00:00", -1.5)] {
            let record = Record::new(ts(at), "delta", value, "scale", "bathroom").unwrap();
            tracker.append(&record, &mut writer).unwrap();
        }

        let bytes = writer.into_inner();
        let rows = tracker
            .filter_rows(io::Cursor::new(bytes), "delta", BucketMode::Hourly, AggregateMode::Max)
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["2024-01-05 06", "delta", "-3.500"],
                vec!["2024-01-05 07", "delta", "-1.500"],
            ]
        );
    }
}
