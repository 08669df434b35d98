//! Conversion orchestration
//!
//! Runs the three external tools against one uploaded source file, in
//! sequence: CAD-to-web converter (writes the bundle tree), feature
//! recognizer, DFM analyzer. Stage failures are captured as error-prefixed
//! text in that stage's slot and the run continues to the next stage.

use crate::config::ToolsConfig;
use crate::services::tools::{ToolCommand, ToolRunner};
use crate::store::BundleStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// In-memory result of one orchestration run
///
/// Exists only for the duration of one request; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionRun {
    /// Target bundle name (`<source stem>_mtk`)
    pub model_name: String,
    /// Converter stage text
    pub converter_output: String,
    /// Feature recognizer stage text
    pub feature_recognition: String,
    /// DFM analyzer stage text
    pub dfm_analysis: String,
}

/// Orchestrates the converter and analyzer tools
pub struct ConversionOrchestrator {
    store: BundleStore,
    tools: ToolsConfig,
    runner: Arc<dyn ToolRunner>,
}

impl ConversionOrchestrator {
    pub fn new(store: BundleStore, tools: ToolsConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            store,
            tools,
            runner,
        }
    }

    /// Run all three stages against `source`
    ///
    /// The target bundle directory is derived from the source file name and
    /// cleared before the converter runs, so re-converting the same source
    /// overwrites rather than accumulates. Safe to re-run; each stage is
    /// independent and the run as a whole always produces a result.
    pub async fn convert(&self, source: &Path) -> ConversionRun {
        let source_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model");
        let model_name = BundleStore::bundle_name_for(source_name);
        let target = self.store.root().join(&model_name);

        info!(source = %source.display(), bundle = %model_name, "Starting conversion run");

        // Overwrite semantics: clear any previous conversion of this source
        if target.exists() {
            if let Err(e) = std::fs::remove_dir_all(&target) {
                warn!(bundle = %model_name, error = %e, "Failed to clear previous bundle");
            }
        }

        let converter_output = self
            .run_stage("converter", self.tools.converter.as_ref(), source, &target)
            .await;
        let feature_recognition = self
            .run_stage(
                "feature recognizer",
                self.tools.feature_recognizer.as_ref(),
                source,
                &target,
            )
            .await;
        let dfm_analysis = self
            .run_stage(
                "DFM analyzer",
                self.tools.dfm_analyzer.as_ref(),
                source,
                &target,
            )
            .await;

        info!(bundle = %model_name, "Conversion run finished");

        ConversionRun {
            model_name,
            converter_output,
            feature_recognition,
            dfm_analysis,
        }
    }

    /// Run one stage, always returning text for its slot
    async fn run_stage(
        &self,
        label: &str,
        tool: Option<&ToolCommand>,
        source: &Path,
        target: &Path,
    ) -> String {
        let Some(tool) = tool else {
            return format!("ERROR: {} tool not configured", label);
        };

        match self.runner.run(tool, source, target).await {
            Ok(output) if output.success() => {
                let mut text = output.stdout;
                if !output.stderr.is_empty() {
                    if !text.is_empty() && !text.ends_with('\n') {
                        text.push('\n');
                    }
                    text.push_str(&output.stderr);
                }
                text
            }
            Ok(output) => {
                warn!(stage = label, exit_code = ?output.exit_code, "Tool exited with failure");
                format!(
                    "ERROR: {} exited with status {}\n{}{}",
                    label,
                    output
                        .exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string()),
                    output.stdout,
                    output.stderr
                )
            }
            Err(e) => {
                warn!(stage = label, error = %e, "Tool invocation failed");
                format!("ERROR: {}: {}", label, e)
            }
        }
    }
}
