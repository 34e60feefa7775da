//! Automation lifecycle: one background thread per run, driven by a
//! cancellable poll loop.

use std::path::Path;
use std::thread::{self, JoinHandle};

use crate::actuator;
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::logger;
use crate::matcher;
use crate::platform::{Platform, PlatformFactory};
use crate::sampler;
use crate::settings::Config;
use crate::sleep::{cancel_pair, CancelToken, Canceller};
use crate::types::{Frame, Point, RunState};

/// Display the loop captures from.
const DISPLAY: usize = 0;

struct Run {
    canceller: Canceller,
    handle: JoinHandle<()>,
}

/// Owns at most one automation run at a time.
pub struct Controller {
    factory: PlatformFactory,
    events: EventSink,
    run: Option<Run>,
    // Worker of the last stopped run, still winding down.
    retired: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(factory: PlatformFactory, events: EventSink) -> Self {
        Self { factory, events, run: None, retired: None }
    }

    /// `Running` only while the worker thread is alive.
    pub fn state(&self) -> RunState {
        match &self.run {
            Some(run) if !run.handle.is_finished() => RunState::Running,
            _ => RunState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Collect a worker that exited without being stopped and report it.
    pub fn reap(&mut self) {
        if self.state() == RunState::Running {
            return;
        }
        let Some(run) = self.run.take() else {
            return;
        };
        let msg = match run.handle.join() {
            Err(_) => "automation thread died unexpectedly",
            Ok(()) => "automation thread exited unexpectedly",
        };
        logger::error(msg);
        self.events.error(msg);
    }

    /// Begin polling with `config`. Rejected with `AlreadyRunning` (and no
    /// events) while a run is active, and with `Stopping` while the previous
    /// worker is still finishing its cycle.
    pub fn start(&mut self, config: Config) -> Result<()> {
        self.reap();
        if self.run.is_some() {
            logger::warn("start ignored: automation already running");
            return Err(Error::AlreadyRunning);
        }
        if self.retired.as_ref().is_some_and(|h| !h.is_finished()) {
            logger::warn("start ignored: previous run still stopping");
            return Err(Error::Stopping);
        }
        config.validate()?;
        self.join_retired();

        self.events.info("=== automation started ===");
        for line in config.summary() {
            self.events.info(line);
        }

        let (canceller, token) = cancel_pair();
        let factory = self.factory.clone();
        let events = self.events.clone();
        // The platform may not be Send, so the worker is assembled on its own thread.
        let handle = thread::Builder::new()
            .name("seeker-automation".to_string())
            .spawn(move || {
                Worker { config, factory, events, token, platform: None, cycle: 0 }.run()
            })
            .map_err(|e| {
                let err = Error::PlatformUnavailable(format!("cannot spawn automation thread: {}", e));
                self.events.error(err.to_string());
                err
            })?;

        logger::info("automation thread started");
        self.run = Some(Run { canceller, handle });
        Ok(())
    }

    /// Signal the run to end and return to idle without waiting for it.
    pub fn stop(&mut self) -> Result<()> {
        self.reap();
        let Some(mut run) = self.run.take() else {
            return Err(Error::NotRunning);
        };
        self.events.info("=== stopping automation ===");
        run.canceller.cancel();
        self.join_retired();
        self.retired = Some(run.handle);
        Ok(())
    }

    /// Block until the last stopped worker has exited.
    pub fn join_retired(&mut self) {
        if let Some(handle) = self.retired.take() {
            if handle.join().is_err() {
                logger::error("automation thread panicked");
            }
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.stop();
        self.join_retired();
    }
}

enum Lookup {
    Clicked { at: Point, score: f64 },
    NotFound { best: f64 },
    Cancelled,
}

/// State owned by the automation thread.
struct Worker {
    config: Config,
    factory: PlatformFactory,
    events: EventSink,
    token: CancelToken,
    platform: Option<Box<dyn Platform>>,
    cycle: u64,
}

impl Worker {
    fn run(mut self) {
        while !self.token.is_cancelled() {
            self.cycle += 1;
            self.events.info(format!("=== cycle #{} ===", self.cycle));
            self.run_cycle();
            if self.token.sleep_secs(self.config.loop_delay_seconds) {
                break;
            }
        }
        self.events.info("automation stopped");
    }

    fn platform(&mut self) -> Result<&mut dyn Platform> {
        let platform = match self.platform.take() {
            Some(p) => p,
            None => {
                let p = (self.factory)()?;
                logger::info(&format!("automation using {} platform", p.name()));
                p
            }
        };
        Ok(self.platform.insert(platform).as_mut())
    }

    fn run_cycle(&mut self) {
        let frame = match self.platform().and_then(|p| p.capture_display(DISPLAY)) {
            Ok(frame) => frame,
            Err(e) => {
                self.events.error(e.to_string());
                return;
            }
        };

        let target = self.config.target();
        let image = match sampler::find_color(&frame, &self.config) {
            Some(y) => {
                self.events.success(format!("color {} found at Y={}", target, y));
                self.config.good_image_path.clone()
            }
            None => {
                self.events.warn(format!(
                    "color {} not found at X={}, Y={}-{}",
                    target, self.config.color_x1, self.config.color_y1, self.config.color_y2
                ));
                self.config.bad_image_path.clone()
            }
        };
        if self.token.is_cancelled() {
            return;
        }

        self.events.info(format!("looking for image {}", image.display()));
        match self.find_and_click(&frame, &image) {
            Ok(Lookup::Clicked { at, score }) => self.events.success(format!(
                "clicked {} at X={}, Y={} (match {:.0}%)",
                image.display(),
                at.x,
                at.y,
                score * 100.0
            )),
            Ok(Lookup::NotFound { best }) => self.events.error(format!(
                "image {} not found (best match {:.0}%, need {:.0}%)",
                image.display(),
                best * 100.0,
                self.config.match_threshold * 100.0
            )),
            Ok(Lookup::Cancelled) => {}
            Err(e) => self.events.error(format!("image lookup failed: {}", e)),
        }
    }

    fn find_and_click(&mut self, frame: &Frame, path: &Path) -> Result<Lookup> {
        let template = matcher::load_template(path)?;
        let m = matcher::locate(frame, &template, self.config.search_scale, self.config.refine_radius)?;
        logger::info(&format!(
            "{}: best {:?} score {:.4} (coarse {:.4}, {} comparisons)",
            path.display(),
            m.position,
            m.score,
            m.coarse_score,
            m.comparisons
        ));
        if m.score < self.config.match_threshold {
            return Ok(Lookup::NotFound { best: m.score });
        }
        // no clicks once stop has been requested
        if self.token.is_cancelled() {
            return Ok(Lookup::Cancelled);
        }
        let at = matcher::click_point(frame, &template, &m);
        actuator::move_and_click(self.platform()?, at)?;
        Ok(Lookup::Clicked { at, score: m.score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, EventStream, Level, StatusEvent};
    use crate::types::Rgb;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    const WAIT: Duration = Duration::from_secs(10);

    struct Scripted {
        frame: Option<Frame>,
        cursor: Point,
        clicks: Arc<Mutex<Vec<Point>>>,
        capture_delay: Duration,
    }

    impl Platform for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capture_display(&mut self, _index: usize) -> Result<Frame> {
            thread::sleep(self.capture_delay);
            self.frame
                .clone()
                .ok_or_else(|| Error::CaptureFailed("display unavailable".into()))
        }

        fn move_cursor(&mut self, x: i32, y: i32) -> Result<()> {
            self.cursor = Point::new(x, y);
            Ok(())
        }

        fn click(&mut self) -> Result<()> {
            self.clicks.lock().unwrap().push(self.cursor);
            Ok(())
        }
    }

    struct Crashing;

    impl Platform for Crashing {
        fn name(&self) -> &str {
            "crashing"
        }

        fn capture_display(&mut self, _index: usize) -> Result<Frame> {
            panic!("display driver crashed");
        }

        fn move_cursor(&mut self, _x: i32, _y: i32) -> Result<()> {
            Ok(())
        }

        fn click(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        controller: Controller,
        stream: EventStream,
        clicks: Arc<Mutex<Vec<Point>>>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(frame: Option<Frame>) -> Self {
            Self::slow(frame, Duration::ZERO)
        }

        fn slow(frame: Option<Frame>, capture_delay: Duration) -> Self {
            let clicks = Arc::new(Mutex::new(Vec::new()));
            let factory_clicks = Arc::clone(&clicks);
            let factory: PlatformFactory = Arc::new(move || {
                Ok(Box::new(Scripted {
                    frame: frame.clone(),
                    cursor: Point::default(),
                    clicks: Arc::clone(&factory_clicks),
                    capture_delay,
                }) as Box<dyn Platform>)
            });
            Self::with_factory(factory, clicks)
        }

        fn with_factory(factory: PlatformFactory, clicks: Arc<Mutex<Vec<Point>>>) -> Self {
            let (sink, stream) = events::channel(1024);
            Self {
                controller: Controller::new(factory, sink),
                stream,
                clicks,
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn write_image(&self, name: &str, frame: &Frame) -> PathBuf {
            let path = self.dir.path().join(name);
            image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
                .unwrap()
                .save(&path)
                .unwrap();
            path
        }

        fn config(&self) -> Config {
            Config {
                good_image_path: self.dir.path().join("Good.png"),
                bad_image_path: self.dir.path().join("bad.png"),
                loop_delay_seconds: 30.0,
                search_scale: 4,
                refine_radius: 8,
                ..Config::default()
            }
        }

        /// Start once the previous worker has fully exited.
        fn restart(&mut self) {
            let deadline = Instant::now() + WAIT;
            loop {
                match self.controller.start(self.config()) {
                    Ok(()) => return,
                    Err(Error::Stopping) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                    Err(e) => panic!("restart failed: {e}"),
                }
            }
        }

        /// Receive events until one satisfies `pred`; returns everything seen.
        fn until(&self, pred: impl Fn(&StatusEvent) -> bool) -> Vec<StatusEvent> {
            let deadline = Instant::now() + WAIT;
            let mut seen = Vec::new();
            while Instant::now() < deadline {
                if let Some(ev) = self.stream.recv_timeout(Duration::from_millis(50)) {
                    let done = pred(&ev);
                    seen.push(ev);
                    if done {
                        return seen;
                    }
                }
            }
            panic!("timed out; events so far: {:#?}", seen);
        }
    }

    fn has(text: &'static str) -> impl Fn(&StatusEvent) -> bool {
        move |ev| ev.message.contains(text)
    }

    fn patch() -> Frame {
        let mut p = Frame::filled(16, 16, Rgb::default());
        for y in 0..16 {
            for x in 0..16 {
                p.set(x, y, Rgb::new(40 + x as u8 * 12, 200 - y as u8 * 9, 90));
            }
        }
        p
    }

    fn screen() -> Frame {
        Frame::filled(200, 500, Rgb::new(0x20, 0x20, 0x20))
    }

    #[test]
    fn test_color_found_clicks_good_image() {
        let mut frame = screen();
        frame.set(11, 430, Rgb::new(0x78, 0x61, 0x4C));
        frame.blit(&patch(), 40, 60);
        let mut h = Harness::new(Some(frame));
        h.write_image("Good.png", &patch());
        h.write_image("bad.png", &Frame::filled(10, 10, Rgb::new(255, 255, 255)));

        h.controller.start(h.config()).unwrap();
        let seen = h.until(has("clicked"));

        assert!(seen
            .iter()
            .any(|e| e.level == Level::Success && e.message.contains("430")));
        assert!(seen.iter().any(|e| e.message.contains("Good.png")));
        let clicked = seen.last().unwrap();
        assert_eq!(clicked.level, Level::Success);
        assert!(clicked.message.contains("X=48, Y=68"), "{}", clicked.message);
        assert!(clicked.message.contains("100%"), "{}", clicked.message);
        assert_eq!(*h.clicks.lock().unwrap(), vec![Point::new(48, 68)]);

        h.controller.stop().unwrap();
        h.until(has("automation stopped"));
    }

    #[test]
    fn test_color_missing_looks_up_bad_image() {
        let mut h = Harness::new(Some(screen()));
        h.write_image("Good.png", &patch());
        h.write_image("bad.png", &Frame::filled(10, 10, Rgb::new(255, 255, 255)));

        h.controller.start(h.config()).unwrap();
        let seen = h.until(has("not found (best match"));

        let warn = seen.iter().position(|e| e.level == Level::Warning).unwrap();
        let lookup = seen.iter().position(|e| e.message.contains("looking for image")).unwrap();
        assert!(warn < lookup);
        assert!(seen[lookup].message.contains("bad.png"));
        assert_eq!(seen.last().unwrap().level, Level::Error);
        assert!(h.clicks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_capture_failure_is_one_error_and_run_continues() {
        let mut h = Harness::new(None);
        h.controller.start(h.config()).unwrap();
        let mut seen = h.until(|e| e.level == Level::Error);
        assert!(seen.last().unwrap().message.contains("capture"));

        thread::sleep(Duration::from_millis(200));
        seen.extend(h.stream.drain());
        assert!(h.controller.is_running());

        h.controller.stop().unwrap();
        seen.extend(h.until(has("automation stopped")));
        let errors = seen.iter().filter(|e| e.level == Level::Error).count();
        assert_eq!(errors, 1, "{:#?}", seen);
        assert_eq!(seen.iter().filter(|e| e.message.contains("cycle #")).count(), 1);
    }

    #[test]
    fn test_stop_during_delay_returns_promptly() {
        let mut h = Harness::new(Some(screen()));
        h.controller.start(h.config()).unwrap();
        h.until(has("image lookup failed"));

        let started = Instant::now();
        h.controller.stop().unwrap();
        assert_eq!(h.controller.state(), RunState::Idle);
        h.until(has("automation stopped"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_double_start_keeps_one_run() {
        let mut h = Harness::new(None);
        h.controller.start(h.config()).unwrap();
        let err = h.controller.start(h.config()).unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning));
        assert!(err.is_benign());

        let mut seen = h.until(has("cycle #1"));
        h.controller.stop().unwrap();
        seen.extend(h.until(has("automation stopped")));
        assert_eq!(seen.iter().filter(|e| e.message.contains("automation started")).count(), 1);
        assert_eq!(seen.iter().filter(|e| e.message.contains("cycle #1")).count(), 1);

        // a fresh run counts cycles from 1 again
        h.restart();
        h.until(has("cycle #1"));
        h.controller.stop().unwrap();
        h.until(has("automation stopped"));
    }

    #[test]
    fn test_stop_when_idle_is_benign() {
        let mut h = Harness::new(None);
        let err = h.controller.stop().unwrap_err();
        assert!(matches!(err, Error::NotRunning));
        assert!(err.is_benign());

        h.controller.start(h.config()).unwrap();
        h.controller.stop().unwrap();
        assert!(matches!(h.controller.stop(), Err(Error::NotRunning)));
        h.until(has("automation stopped"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut h = Harness::new(None);
        let mut cfg = h.config();
        cfg.color_y1 = 900;
        assert!(matches!(h.controller.start(cfg), Err(Error::ConfigInvalid(_))));
        assert_eq!(h.controller.state(), RunState::Idle);
        assert!(h.stream.is_empty());
    }

    #[test]
    fn test_oversized_template_is_reported() {
        let mut h = Harness::new(Some(screen()));
        h.write_image("bad.png", &Frame::filled(300, 10, Rgb::default()));
        h.controller.start(h.config()).unwrap();
        let seen = h.until(has("image lookup failed"));
        assert!(seen.last().unwrap().message.contains("does not fit"));
        assert!(h.controller.is_running());
    }

    #[test]
    fn test_summary_emitted_before_first_cycle() {
        let mut h = Harness::new(None);
        h.controller.start(h.config()).unwrap();
        let seen = h.until(has("cycle #1"));
        assert!(seen[0].message.contains("automation started"));
        assert!(seen.iter().any(|e| e.message.contains("#77604B")));
        assert!(seen.iter().any(|e| e.message.contains("Y=420-440")));
        assert!(seen.iter().all(|e| e.level == Level::Info));
    }

    #[test]
    fn test_stop_is_announced_before_worker_exits() {
        let mut h = Harness::new(None);
        h.controller.start(h.config()).unwrap();
        h.until(has("cycle #1"));
        h.controller.stop().unwrap();
        let seen = h.until(has("automation stopped"));
        let stopping = seen.iter().position(|e| e.message.contains("stopping automation"));
        assert_eq!(stopping, Some(seen.len() - 2), "{:#?}", seen);
    }

    #[test]
    fn test_restart_during_slow_cycle_does_not_block() {
        let mut h = Harness::slow(Some(screen()), Duration::from_millis(600));
        h.controller.start(h.config()).unwrap();
        h.until(has("cycle #1"));
        h.controller.stop().unwrap();

        let started = Instant::now();
        let err = h.controller.start(h.config()).unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(matches!(err, Error::Stopping));
        assert!(err.is_benign());
        assert_eq!(h.controller.state(), RunState::Idle);

        // the cancelled cycle ends without looking up an image
        let seen = h.until(has("automation stopped"));
        assert!(!seen.iter().any(|e| e.message.contains("looking for image")), "{:#?}", seen);

        h.restart();
        assert!(h.controller.is_running());
        h.until(has("cycle #1"));
        h.controller.stop().unwrap();
    }

    #[test]
    fn test_dead_worker_is_reported() {
        let factory: PlatformFactory = Arc::new(|| Ok(Box::new(Crashing) as Box<dyn Platform>));
        let mut h = Harness::with_factory(factory, Arc::new(Mutex::new(Vec::new())));
        h.controller.start(h.config()).unwrap();
        h.until(has("cycle #1"));

        let deadline = Instant::now() + WAIT;
        while h.controller.is_running() {
            assert!(Instant::now() < deadline, "worker never exited");
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(h.controller.state(), RunState::Idle);

        h.controller.reap();
        let seen = h.until(|e| e.level == Level::Error);
        assert!(seen.last().unwrap().message.contains("died unexpectedly"));
        assert!(matches!(h.controller.stop(), Err(Error::NotRunning)));
    }

    #[test]
    fn test_huge_delay_keeps_worker_alive() {
        let mut h = Harness::new(None);
        let cfg = Config { loop_delay_seconds: 1e20, ..h.config() };
        assert!(cfg.validate().is_ok());
        h.controller.start(cfg).unwrap();
        h.until(|e| e.level == Level::Error);

        thread::sleep(Duration::from_millis(100));
        assert!(h.controller.is_running());
        h.controller.stop().unwrap();
        h.until(has("automation stopped"));
    }
}
