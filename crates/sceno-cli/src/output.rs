//! Progress output on stderr

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use sceno::{ScenarioResult, ScenarioStatus, Suite, SuiteResult};

/// Progress reporter for suite runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print step records of failing scenarios
    pub verbose: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// Also print the step records of failing scenarios
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.println(text),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn marker(&self, status: ScenarioStatus) -> String {
        let (symbol, plain, color) = match status {
            ScenarioStatus::Passed => ("✓", "PASS ", Style::new().green().bold()),
            ScenarioStatus::Failed => ("✗", "FAIL ", Style::new().red().bold()),
            ScenarioStatus::Errored => ("!", "ERROR", Style::new().yellow().bold()),
        };
        if self.use_color {
            color.apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    /// Report one finished scenario
    pub fn scenario_finished(&self, result: &ScenarioResult) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
        if self.quiet && result.is_passed() {
            return;
        }

        let millis = result.duration.as_millis();
        self.line(&format!("{} {} ({millis}ms)", self.marker(result.status), result.id));
        if let Some(ref diagnostic) = result.diagnostic {
            self.line(&format!("      {diagnostic}"));
        }
        if let Some(ref artifact) = result.artifact {
            self.line(&format!("      screenshot: {}", artifact.display()));
        }
        if self.verbose && !result.is_passed() {
            for step in &result.steps {
                self.line(&format!(
                    "      {:>3}. {:<8} {}",
                    step.step,
                    step.status,
                    step.action
                ));
            }
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the closing summary
    pub fn summary(&self, result: &SuiteResult) {
        if self.quiet && result.all_passed() {
            return;
        }

        let _ = self.term.write_line("");
        let totals = result.totals;
        let secs = result.duration.as_secs_f64();
        let failed = !result.all_passed();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let errored_style = Style::new().yellow().bold();
            let status = if failed {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} errored)",
                status,
                totals.total(),
                secs,
                passed_style.apply_to(totals.passed),
                failed_style.apply_to(totals.failed),
                errored_style.apply_to(totals.errored)
            ));
        } else {
            let status = if failed { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {} scenarios in {secs:.2}s ({} passed, {} failed, {} errored)",
                totals.total(),
                totals.passed,
                totals.failed,
                totals.errored
            ));
        }
    }
}

/// Scenario listing for `sceno list`
#[must_use]
pub fn render_listing(suite: &Suite) -> String {
    let mut out = format!("{} ({} scenarios)\n", suite.name, suite.scenarios.len());
    for scenario in &suite.scenarios {
        out.push_str(&format!("  {:<32} {:>3} steps", scenario.id, scenario.steps.len()));
        if !scenario.description.is_empty() {
            out.push_str(&format!("  {}", scenario.description));
        }
        out.push('\n');
    }
    out
}
