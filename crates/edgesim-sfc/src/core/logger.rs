/// Logging facilities to record events during simulation.
use std::fs::File;
use std::io::Write;

use log::Level;
use serde::Serialize;

use edgesim_core::SimulationContext;
use edgesim_core::{log_debug, log_error, log_info, log_trace, log_warn};

pub trait Logger {
    fn log_error(&mut self, ctx: &SimulationContext, log: String);

    fn log_warn(&mut self, ctx: &SimulationContext, log: String);

    fn log_info(&mut self, ctx: &SimulationContext, log: String);

    fn log_debug(&mut self, ctx: &SimulationContext, log: String);

    fn log_trace(&mut self, ctx: &SimulationContext, log: String);

    fn save_log(&self, _path: &str) -> Result<(), std::io::Error>;
}

#[derive(Default)]
pub struct StdoutLogger {}

impl StdoutLogger {
    pub fn new() -> Self {
        Self {}
    }
}

impl Logger for StdoutLogger {
    fn log_error(&mut self, ctx: &SimulationContext, log: String) {
        log_error!(ctx, log);
    }

    fn log_warn(&mut self, ctx: &SimulationContext, log: String) {
        log_warn!(ctx, log);
    }

    fn log_info(&mut self, ctx: &SimulationContext, log: String) {
        log_info!(ctx, log);
    }

    fn log_debug(&mut self, ctx: &SimulationContext, log: String) {
        log_debug!(ctx, log);
    }

    fn log_trace(&mut self, ctx: &SimulationContext, log: String) {
        log_trace!(ctx, log);
    }

    fn save_log(&self, _path: &str) -> Result<(), std::io::Error> {
        Ok(())
    }
}

#[derive(Serialize)]
struct LogEntry {
    timestamp: f64,
    component: String,
    message: String,
}

/// Collects log entries in memory and saves them as JSON lines on demand.
pub struct FileLogger {
    log: Vec<LogEntry>,
    level: Level,
}

impl Default for FileLogger {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            level: Level::Info,
        }
    }
}

impl FileLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: Level) -> Self {
        Self { log: Vec::new(), level }
    }

    fn log_internal(&mut self, ctx: &SimulationContext, message: String, level: Level) {
        if self.level < level {
            return;
        }
        self.log.push(LogEntry {
            timestamp: ctx.time(),
            component: ctx.name().to_string(),
            message,
        });
    }
}

impl Logger for FileLogger {
    fn log_error(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Error)
    }

    fn log_warn(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Warn)
    }

    fn log_info(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Info)
    }

    fn log_debug(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Debug)
    }

    fn log_trace(&mut self, ctx: &SimulationContext, log: String) {
        self.log_internal(ctx, log, Level::Trace)
    }

    fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        let mut file = File::create(path)?;
        for entry in &self.log {
            writeln!(file, "{}", serde_json::to_string(entry)?)?;
        }
        Ok(())
    }
}
