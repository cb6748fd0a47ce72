use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Counters for the layer currently running.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LayerTally {
    index: usize,
    size: usize,
    done: usize,
    failed: usize,
}

/// Terminal progress for one execution run, drawn to stderr.
///
/// The overall bar counts finished subtasks across the run; its message
/// tracks the current dependency layer. Each running subtask gets a spinner
/// tagged with its layer. Counters are kept even when drawing is disabled.
pub struct ProgressMonitor {
    multi: MultiProgress,
    overall: ProgressBar,
    running: HashMap<String, ProgressBar>,
    layer: LayerTally,
    total_layers: usize,
    failed: usize,
    enabled: bool,
}

impl ProgressMonitor {
    pub fn new(total_tasks: usize, total_layers: usize, enabled: bool) -> Self {
        let multi = MultiProgress::new();
        let overall = if enabled {
            let bar = multi.add(ProgressBar::new(total_tasks as u64));
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{prefix:.bold} [{elapsed}] {wide_bar:.green/white} {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("=> "));
            }
            bar.set_prefix("subagent");
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            multi,
            overall,
            running: HashMap::new(),
            layer: LayerTally::default(),
            total_layers,
            failed: 0,
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0, false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Begin layer `index` with the given subtasks.
    pub fn start_layer(&mut self, index: usize, task_ids: &[String]) {
        self.layer = LayerTally {
            index,
            size: task_ids.len(),
            ..LayerTally::default()
        };

        if self.enabled {
            for id in task_ids {
                let bar = self.multi.add(ProgressBar::new_spinner());
                if let Ok(style) = ProgressStyle::default_spinner().template("    {spinner} {msg}") {
                    bar.set_style(style.tick_chars("-\\|/ "));
                }
                bar.set_message(format!("L{} {}", index + 1, id));
                bar.enable_steady_tick(Duration::from_millis(120));
                self.running.insert(id.clone(), bar);
            }
        }
        self.refresh();
    }

    pub fn complete_task(&mut self, task_id: &str, success: bool, duration_ms: u64) {
        self.layer.done += 1;
        if !success {
            self.layer.failed += 1;
            self.failed += 1;
        }

        if let Some(bar) = self.running.remove(task_id) {
            let status = if success { "ok" } else { "FAILED" };
            bar.finish_with_message(format!(
                "L{} {} {} ({}ms)",
                self.layer.index + 1,
                task_id,
                status,
                duration_ms
            ));
        }
        if self.enabled {
            self.overall.inc(1);
        }
        self.refresh();
    }

    pub fn finish(&self) {
        if self.enabled {
            self.overall.finish_with_message(self.summary_message());
        }
    }

    fn refresh(&self) {
        if self.enabled {
            self.overall.set_message(self.layer_message());
        }
    }

    fn layer_message(&self) -> String {
        let mut msg = format!(
            "layer {}/{}: {}/{} done",
            self.layer.index + 1,
            self.total_layers.max(1),
            self.layer.done,
            self.layer.size
        );
        if self.layer.failed > 0 {
            msg.push_str(&format!(", {} failed", self.layer.failed));
        }
        msg
    }

    fn summary_message(&self) -> String {
        let layers = self.total_layers;
        let noun = if layers == 1 { "layer" } else { "layers" };
        if self.failed == 0 {
            format!("all subtasks succeeded in {} {}", layers, noun)
        } else {
            format!("{} subtask(s) failed across {} {}", self.failed, layers, noun)
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        for (_, bar) in self.running.drain() {
            bar.finish_and_clear();
        }
    }
}
