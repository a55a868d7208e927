use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "solder",
    about = "Solder: dependency-graph assembly, validation, planning, and execution",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assemble a wiring spec and validate the binding graph
    GraphCheck {
        /// Path to the wiring spec JSON
        #[arg(long)]
        spec: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Project the deterministic execution plan for one component
    Plan {
        /// Path to the wiring spec JSON
        #[arg(long)]
        spec: String,

        /// Component path, e.g. `app/request`. Defaults to the root.
        #[arg(long)]
        component: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a component's entry points with spec-declared providers
    Resolve {
        /// Path to the wiring spec JSON
        #[arg(long)]
        spec: String,

        /// Component path, e.g. `app/request`. Defaults to the root.
        #[arg(long)]
        component: Option<String>,

        /// Key to resolve, `Type` or `Type @qualifier` (repeatable).
        /// Omit to resolve the component's declared entry points.
        #[arg(long = "entry")]
        entries: Vec<String>,

        /// Execute on a tokio runtime instead of inline
        #[arg(long = "async")]
        use_async: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
