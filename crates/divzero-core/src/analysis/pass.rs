use super::{analyze_function, AnalysisConfig, AnalysisError, AnalysisResult, Diagnostic};
use crate::function::Function;
use crate::module::Module;
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PassStatistics {
    pub name: String,
    pub function: String,
    pub duration: Duration,
    pub iterations: usize,
}

/// An analysis run independently over each function of a module.
pub trait FunctionPass {
    type Output;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "No description provided"
    }

    fn run_on_function(&mut self, function: &Function) -> Result<Self::Output, AnalysisError>;

    /// Results keyed by function name, in module order.
    fn run_on_module(
        &mut self,
        module: &Module,
    ) -> Result<IndexMap<String, Self::Output>, AnalysisError> {
        let mut results = IndexMap::new();
        for (name, function) in &module.functions {
            results.insert(name.clone(), self.run_on_function(function)?);
        }
        Ok(results)
    }
}

/// The divide-by-zero analysis as a pass, recording timing per function.
pub struct DivZeroPass {
    config: AnalysisConfig,
    collect_stats: bool,
    statistics: Vec<PassStatistics>,
}

impl DivZeroPass {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            collect_stats: false,
            statistics: Vec::new(),
        }
    }

    pub fn enable_statistics(&mut self) {
        self.collect_stats = true;
    }

    pub fn statistics(&self) -> &[PassStatistics] {
        &self.statistics
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyzes one named function of `module`.
    pub fn run_on_named(
        &mut self,
        module: &Module,
        name: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let function = module
            .functions
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownFunction(name.to_string()))?;
        self.run_on_function(function)
    }

    /// Every diagnostic of every function in `module`.
    pub fn diagnose_module(&mut self, module: &Module) -> Result<Vec<Diagnostic>, AnalysisError> {
        Ok(self
            .run_on_module(module)?
            .into_values()
            .flat_map(|result| result.diagnostics().to_vec())
            .collect())
    }
}

impl Default for DivZeroPass {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl FunctionPass for DivZeroPass {
    type Output = AnalysisResult;

    fn name(&self) -> &'static str {
        "divzero"
    }

    fn description(&self) -> &'static str {
        "Flags integer divisions whose divisor is not proven nonzero"
    }

    fn run_on_function(&mut self, function: &Function) -> Result<AnalysisResult, AnalysisError> {
        let start = self.collect_stats.then(Instant::now);
        debug!(function = %function.name, mode = %self.config.mode, "analyzing");

        let result = analyze_function(function, &self.config)?;

        if let Some(start) = start {
            self.statistics.push(PassStatistics {
                name: self.name().to_string(),
                function: function.name.clone(),
                duration: start.elapsed(),
                iterations: result.iterations(),
            });
        }
        Ok(result)
    }
}
