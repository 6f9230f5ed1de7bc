use crate::core::{NaiveTiming, RetryPolicy};
use crate::scenario::SimulationConfig;
use crate::types::Balance;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Simulate concurrent bank-account updates, deadlock and deadlock avoidance
#[derive(Parser, Debug)]
#[command(name = "bank-lock-sim")]
#[command(
    about = "Simulate concurrent bank-account updates, deadlock and deadlock avoidance",
    long_about = None
)]
pub struct CliArgs {
    /// Which phase to run
    #[arg(
        long = "phase",
        value_name = "PHASE",
        default_value = "all",
        help = "Phase to run: 'all', 'race', 'mutex', 'deadlock' or 'avoidance'"
    )]
    pub phase: PhaseSelection,

    #[arg(
        long = "accounts",
        value_name = "COUNT",
        help = "Number of accounts in the store (default: 5)"
    )]
    pub accounts: Option<usize>,

    #[arg(
        long = "initial-balance",
        value_name = "AMOUNT",
        allow_negative_numbers = true,
        help = "Balance every account starts each phase with (default: 100)"
    )]
    pub initial_balance: Option<Balance>,

    #[arg(
        long = "operation-amount",
        value_name = "AMOUNT",
        allow_negative_numbers = true,
        help = "Deposit/withdraw amount for the race and mutex phases (default: 50)"
    )]
    pub operation_amount: Option<Balance>,

    #[arg(
        long = "forward-amount",
        value_name = "AMOUNT",
        allow_negative_numbers = true,
        help = "Amount moved from the first transfer account to the second (default: 30)"
    )]
    pub forward_amount: Option<Balance>,

    #[arg(
        long = "reverse-amount",
        value_name = "AMOUNT",
        allow_negative_numbers = true,
        help = "Amount moved from the second transfer account to the first (default: 20)"
    )]
    pub reverse_amount: Option<Balance>,

    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Lock attempts before an ordered transfer aborts (default: 5)"
    )]
    pub max_attempts: Option<u32>,

    #[arg(
        long = "work-delay-ms",
        value_name = "MS",
        help = "Delay inside an operation's critical section (default: 100)"
    )]
    pub work_delay_ms: Option<u64>,

    #[arg(
        long = "hazard-delay-ms",
        value_name = "MS",
        help = "Delay between a naive transfer's two lock requests (default: 100)"
    )]
    pub hazard_delay_ms: Option<u64>,

    #[arg(
        long = "backoff-min-ms",
        value_name = "MS",
        help = "Shortest back-off after a failed ordered attempt (default: 100)"
    )]
    pub backoff_min_ms: Option<u64>,

    #[arg(
        long = "backoff-max-ms",
        value_name = "MS",
        help = "Longest back-off after a failed ordered attempt (default: 200)"
    )]
    pub backoff_max_ms: Option<u64>,

    #[arg(
        long = "observe-ms",
        value_name = "MS",
        help = "How long the deadlock phase watches before logging that no circular wait has formed (default: 1000)"
    )]
    pub observe_ms: Option<u64>,

    /// Write final account balances to this CSV file
    #[arg(long = "balances", value_name = "PATH")]
    pub balances: Option<PathBuf>,

    /// Only log warnings and errors, unless RUST_LOG says otherwise
    #[arg(long = "quiet", short = 'q')]
    pub quiet: bool,
}

/// Phases that can be selected on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PhaseSelection {
    All,
    Race,
    Mutex,
    Deadlock,
    Avoidance,
}

impl CliArgs {
    /// Create a SimulationConfig from CLI arguments
    ///
    /// Flags that were not given keep their default. The result goes through
    /// [`SimulationConfig::validated`], which warns about and replaces
    /// unusable values.
    pub fn to_config(&self) -> SimulationConfig {
        let default = SimulationConfig::default();
        let millis = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };

        SimulationConfig {
            accounts: self.accounts.unwrap_or(default.accounts),
            initial_balance: self.initial_balance.unwrap_or(default.initial_balance),
            operation_amount: self.operation_amount.unwrap_or(default.operation_amount),
            transfer_accounts: default.transfer_accounts,
            forward_amount: self.forward_amount.unwrap_or(default.forward_amount),
            reverse_amount: self.reverse_amount.unwrap_or(default.reverse_amount),
            work_delay: millis(self.work_delay_ms, default.work_delay),
            naive: NaiveTiming {
                hazard_delay: millis(self.hazard_delay_ms, default.naive.hazard_delay),
                poll_interval: default.naive.poll_interval,
            },
            retry: RetryPolicy {
                max_attempts: self.max_attempts.unwrap_or(default.retry.max_attempts),
                backoff_min: millis(self.backoff_min_ms, default.retry.backoff_min),
                backoff_max: millis(self.backoff_max_ms, default.retry.backoff_max),
            },
            observation_window: millis(self.observe_ms, default.observation_window),
        }
        .validated()
    }
}
