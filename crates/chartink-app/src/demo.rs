//! Scripted session used by the native binary.

use std::rc::Rc;

use chartink_core::chart::{Bar, BarSeries};
use chartink_core::config::EngineConfig;
use chartink_core::input::PointerEvent;
use chartink_core::storage::KeyValueStore;
use chartink_core::store::ShapeStore;
use chartink_render::{DisplayList, FrameStats};
use kurbo::Size;

use crate::session::{ChartSession, SessionResult, viewport_for};

const DEMO_SIZE: Size = Size::new(800.0, 480.0);

/// What a demo run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    pub drawings: usize,
    pub frame: Option<FrameStats>,
    pub commands: usize,
    pub labels: Vec<String>,
    pub projects: Vec<String>,
}

/// Deterministic hourly bars drifting upward.
pub fn synthetic_bars(count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let open = 100.0 + t * 0.25 + (t * 0.4).sin() * 3.0;
            let close = 100.0 + (t + 1.0) * 0.25 + ((t + 1.0) * 0.4).sin() * 3.0;
            Bar {
                time: t * 3600.0,
                open,
                high: open.max(close) + 0.8,
                low: open.min(close) - 0.8,
                close,
            }
        })
        .collect()
}

fn click(session: &mut ChartSession<DisplayList>, x: f64, y: f64) {
    session.pointer_move(&PointerEvent::at(x, y));
    session.pointer_down(&PointerEvent::at(x, y));
    session.pointer_up(&PointerEvent::at(x, y));
}

/// Place one of several drawings, render a frame and save everything as `slot`.
pub fn run_demo(config: EngineConfig, kv: Rc<dyn KeyValueStore>, slot: &str) -> SessionResult<DemoReport> {
    let bars = synthetic_bars(120);
    let chart = Rc::new(viewport_for(&bars, DEMO_SIZE));
    let series = Rc::new(BarSeries::new("DEMO", "1h", bars));
    let mut session = ChartSession::new(config, kv, chart, series, DisplayList::new(), DEMO_SIZE)?;

    let script: [(&str, &[(f64, f64)]); 5] = [
        ("trendline", &[(40.0, 400.0), (700.0, 90.0)]),
        ("hline", &[(0.0, 240.0)]),
        ("fib", &[(100.0, 380.0), (600.0, 120.0)]),
        ("pitchfork", &[(80.0, 300.0), (300.0, 180.0), (320.0, 320.0)]),
        ("ruler", &[(200.0, 350.0), (520.0, 200.0)]),
    ];
    for (tool, clicks) in script {
        session.set_tool(Some(tool));
        for &(x, y) in clicks {
            click(&mut session, x, y);
        }
    }

    let frame = session.render_frame()?;
    session.snapshot()?;
    session.save_project(slot)?;

    let list = session.surface();
    Ok(DemoReport {
        drawings: session.store().borrow().drawings().len(),
        frame,
        commands: list.len(),
        labels: list.texts().map(str::to_string).collect(),
        projects: session.projects(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartink_core::storage::MemoryKv;

    #[test]
    fn test_synthetic_bars_are_consistent() {
        let bars = synthetic_bars(10);
        assert_eq!(bars.len(), 10);
        for bar in &bars {
            assert!(bar.low < bar.open.min(bar.close));
            assert!(bar.high > bar.open.max(bar.close));
        }
        assert_eq!(bars[9].time, 9.0 * 3600.0);
    }

    #[test]
    fn test_demo_places_every_drawing() {
        let kv = Rc::new(MemoryKv::new());
        let report = run_demo(EngineConfig::default(), kv.clone(), "demo").unwrap();
        assert_eq!(report.drawings, 5);
        let frame = report.frame.unwrap();
        assert_eq!(frame.drawings, 5);
        assert_eq!(frame.skipped, 0);
        assert!(report.commands > 5);
        assert!(report.labels.iter().any(|l| l.contains("over")));
        assert_eq!(report.projects, vec!["demo".to_string()]);
        assert!(kv.len() >= 4);
    }
}
