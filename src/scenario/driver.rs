//! Sequential phase driver

use super::{
    create_phases, PhaseOutcome, PhaseStatus, ScenarioContext, ScenarioPhase, SimulationConfig,
    SimulationReport,
};
use crate::cli::PhaseSelection;
use crate::types::SimulationError;
use tracing::{error, info, info_span, warn};

/// Runs scenario phases one after another against a single store
///
/// A phase whose requests fail validation is recorded as rejected and the
/// run continues with the next phase. Any other error stops the run.
#[derive(Debug)]
pub struct ScenarioDriver {
    ctx: ScenarioContext,
}

impl ScenarioDriver {
    /// Create a driver and its account store
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Ok(Self {
            ctx: ScenarioContext::new(config)?,
        })
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.ctx
    }

    /// Run the phases named by `selection` and collect their outcomes
    pub fn run(&mut self, selection: PhaseSelection) -> Result<SimulationReport, SimulationError> {
        let phases = create_phases(selection);
        let mut outcomes = Vec::with_capacity(phases.len());

        for phase in &phases {
            outcomes.push(self.run_phase(phase.as_ref())?);
        }

        info!("==== all phases complete ====");
        Ok(SimulationReport {
            phases: outcomes,
            final_balances: self.ctx.store().snapshot(),
        })
    }

    /// Run one phase to completion
    pub fn run_phase(&mut self, phase: &dyn ScenarioPhase) -> Result<PhaseOutcome, SimulationError> {
        let kind = phase.kind();
        let _span = info_span!("phase", phase = kind.name()).entered();
        info!("---- Phase {}: {} ----", kind.number(), kind.title());

        let outcome = match phase.run(&mut self.ctx) {
            Ok(outcome) => outcome,
            Err(error) if error.is_configuration_error() => {
                warn!("phase rejected before dispatch: {error}");
                PhaseOutcome::Rejected { phase: kind, error }
            }
            Err(error) => return Err(error),
        };

        match outcome.status() {
            PhaseStatus::Passed | PhaseStatus::Observed => {
                info!(status = outcome.status().label(), "{}", outcome.detail())
            }
            PhaseStatus::Failed | PhaseStatus::Rejected => {
                error!(status = outcome.status().label(), "{}", outcome.detail())
            }
        }
        Ok(outcome)
    }
}
