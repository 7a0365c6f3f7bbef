//! Colorful console output for ModelForge events.
//!
//! Provides a `tracing` layer that formats linearization and goal-solving
//! summaries with colors. Everything else goes through the env filter only.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the console subscriber.
///
/// Safe to call multiple times - only the first call has effect. Does
/// nothing if the application already installed a global subscriber.
/// `RUST_LOG` overrides the default `modelforge=info` level.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(Level::INFO.into())
            .from_env_lossy();

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(ModelForgeConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats ModelForge events with colors.
pub struct ModelForgeConsoleLayer;

impl<S: Subscriber> Layer<S> for ModelForgeConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("modelforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = match visitor.event.as_deref() {
            Some("linearize_end") => format_linearize_end(&visitor),
            Some("goal_solve_start") => format_goal_start(&visitor),
            Some("goal_stage") => format_goal_stage(&visitor),
            Some("solve_model_end") => format_solve_end(&visitor),
            _ if *metadata.level() == Level::WARN => format_warning(&visitor),
            _ => String::new(),
        };
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Default)]
struct EventVisitor {
    event: Option<String>,
    message: Option<String>,
    model: Option<String>,
    optimizer: Option<String>,
    status: Option<String>,
    objective: Option<f64>,
    linearized: Option<u64>,
    native: Option<u64>,
    auxiliary_variables: Option<u64>,
    auxiliary_constraints: Option<u64>,
    goals: Option<u64>,
    priorities: Option<u64>,
    priority: Option<u64>,
    duration_ms: Option<u64>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.record_str(field, s.trim_matches('"'));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "linearized" => self.linearized = Some(value),
            "native" => self.native = Some(value),
            "auxiliary_variables" => self.auxiliary_variables = Some(value),
            "auxiliary_constraints" => self.auxiliary_constraints = Some(value),
            "goals" => self.goals = Some(value),
            "priorities" => self.priorities = Some(value),
            "priority" => self.priority = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Ok(value) = u64::try_from(value) {
            self.record_u64(field, value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == "objective" {
            self.objective = Some(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let value = Some(value.to_string());
        match field.name() {
            "event" => self.event = value,
            "message" => self.message = value,
            "model" => self.model = value,
            "optimizer" => self.optimizer = value,
            "status" => self.status = value,
            _ => {}
        }
    }
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_linearize_end(v: &EventVisitor) -> String {
    format!(
        "{} {} {} {} terms linearized ({} native), auxiliary variables ({}), auxiliary constraints ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Linearize]".bright_cyan(),
        count(v.linearized).bright_yellow(),
        count(v.native).white(),
        count(v.auxiliary_variables).bright_yellow(),
        count(v.auxiliary_constraints).bright_yellow()
    )
}

fn format_goal_start(v: &EventVisitor) -> String {
    format!(
        "{} {} {} {} goals over {} priorities, optimizer ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Goals]".bright_cyan(),
        count(v.goals).bright_yellow(),
        count(v.priorities).bright_yellow(),
        v.optimizer.as_deref().unwrap_or("unknown").white().bold()
    )
}

fn format_goal_stage(v: &EventVisitor) -> String {
    let stage = match v.priority {
        Some(p) => format!("priority {}", p),
        None => "weighted".to_string(),
    };
    format!(
        "    {} {:<12} | {} | objective ({})",
        "->".bright_blue(),
        stage.white(),
        format_status(v.status.as_deref().unwrap_or("N/A")),
        format_objective(v.objective)
    )
}

fn format_solve_end(v: &EventVisitor) -> String {
    format!(
        "{} {} {} {} solved: status ({}), objective ({}), time spent ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Solver]".bright_cyan(),
        v.model.as_deref().unwrap_or("model").white().bold(),
        format_status(v.status.as_deref().unwrap_or("N/A")),
        format_objective(v.objective),
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow()
    )
}

fn format_warning(v: &EventVisitor) -> String {
    format!(
        "{} {} {}",
        timestamp().bright_black(),
        "WARN".bright_yellow(),
        v.message.as_deref().unwrap_or("")
    )
}

fn format_status(status: &str) -> String {
    match status {
        "optimal" => status.bright_green().bold().to_string(),
        "feasible" => status.green().to_string(),
        "infeasible" | "unbounded" => status.bright_red().bold().to_string(),
        _ => status.yellow().to_string(),
    }
}

fn format_objective(objective: Option<f64>) -> String {
    match objective {
        Some(value) => format!("{:.6}", value).bright_magenta().to_string(),
        None => "N/A".white().to_string(),
    }
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| {
            let secs = d.as_secs() % 100000;
            let millis = d.subsec_millis();
            format!("{:5}.{:03}", secs, millis)
        })
        .unwrap_or_else(|_| "    0.000".to_string())
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(1500), "1.50s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
    }

    #[test]
    fn test_stage_label() {
        let weighted = EventVisitor {
            status: Some("optimal".into()),
            ..EventVisitor::default()
        };
        assert!(format_goal_stage(&weighted).contains("weighted"));

        let staged = EventVisitor {
            priority: Some(2),
            ..EventVisitor::default()
        };
        assert!(format_goal_stage(&staged).contains("priority 2"));
    }
}
