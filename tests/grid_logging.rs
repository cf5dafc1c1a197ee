use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use chambua_engine::engine::calculate_correct_scores;
use chambua_engine::poisson::GridSizing;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<String>>>);

struct LineVisitor<'a>(&'a mut String);

impl Visit for LineVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{value:?}"));
        } else {
            self.0.push_str(&format!(" {}={value:?}", field.name()));
        }
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = String::new();
        event.record(&mut LineVisitor(&mut line));
        self.0.lock().unwrap().push(line);
    }
}

fn captured(f: impl FnOnce()) -> Vec<String> {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    let lines = capture.0.lock().unwrap().clone();
    lines
}

#[test]
fn grid_expansion_is_reported() {
    let lines = captured(|| {
        calculate_correct_scores(2.5, 1.5, &GridSizing::default(), 3);
    });
    let line = lines
        .iter()
        .find(|l| l.contains("Adaptive maxGoals="))
        .expect("expansion event");
    assert!(line.contains(r#"event="grid_expanded""#), "{line}");

    let size: usize = line
        .split("maxGoals=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .expect("size in message");
    assert!(size >= 11);
}

#[test]
fn base_grid_logs_nothing() {
    let lines = captured(|| {
        calculate_correct_scores(0.5, 0.5, &GridSizing::default(), 3);
    });
    assert!(lines.iter().all(|l| !l.contains("Adaptive maxGoals=")));
}
