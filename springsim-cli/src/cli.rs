//! Command-line definitions

use clap::{Args, Parser, Subcommand};
use springsim_core::{Limits, RunConfig, SimulationParameters};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "springsim")]
#[command(about = "Live damped spring-mass simulation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one simulation and print every message as a JSON line
    Run {
        #[command(flatten)]
        params: ParamArgs,

        /// Stop after this many data messages
        #[arg(long)]
        samples: Option<u64>,

        #[command(flatten)]
        timing: TimingArgs,

        #[command(flatten)]
        limits: LimitsArgs,
    },
    /// Serve the HTTP and WebSocket API
    Serve {
        /// TCP address to bind
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Frames buffered per WebSocket subscriber before frames are dropped
        #[arg(long, default_value_t = 64)]
        queue_depth: usize,

        #[command(flatten)]
        timing: TimingArgs,

        #[command(flatten)]
        limits: LimitsArgs,
    },
    /// Open a live view driven by a JSON parameter file
    View {
        /// Path to a JSON file with mass, spring_constant, initial_displacement and damping
        file: PathBuf,

        #[command(flatten)]
        timing: TimingArgs,

        #[command(flatten)]
        limits: LimitsArgs,
    },
    /// Print the configured limits as JSON
    Limits {
        #[command(flatten)]
        limits: LimitsArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ParamArgs {
    /// Mass in kg
    #[arg(long)]
    pub mass: f64,

    /// Spring constant in N/m
    #[arg(long)]
    pub spring_constant: f64,

    /// Initial displacement from equilibrium in metres
    #[arg(long, allow_hyphen_values = true)]
    pub displacement: f64,

    /// Damping coefficient
    #[arg(long, default_value_t = 0.0)]
    pub damping: f64,
}

impl ParamArgs {
    pub fn params(&self) -> SimulationParameters {
        SimulationParameters::new(self.mass, self.spring_constant, self.displacement, self.damping)
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct TimingArgs {
    /// Milliseconds between samples (also the simulated time step)
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,
}

impl TimingArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(Duration::from_millis(self.tick_ms.max(1)))
    }
}

#[derive(Args, Debug, Clone, Copy)]
pub struct LimitsArgs {
    /// Maximum mass in kg
    #[arg(long, default_value_t = Limits::default().max_mass)]
    pub max_mass: f64,

    /// Maximum spring constant in N/m
    #[arg(long, default_value_t = Limits::default().max_spring_constant)]
    pub max_spring_constant: f64,

    /// Maximum initial displacement magnitude in metres
    #[arg(long, default_value_t = Limits::default().max_displacement)]
    pub max_displacement: f64,
}

impl LimitsArgs {
    pub fn limits(&self) -> Limits {
        Limits {
            max_mass: self.max_mass,
            max_spring_constant: self.max_spring_constant,
            max_displacement: self.max_displacement,
        }
    }
}
