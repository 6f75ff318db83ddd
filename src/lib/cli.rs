use clap::{ArgAction, Parser};

use crate::lib::spec::Scope;
use crate::lib::units::UnitMode;

/// ps-style resource tables for pods, nodes and namespaces
///
/// FLAGS picks families and metrics, in display order:
///   m memory, c cpu;
///   r requests, l limits, u usage, p percent of the two preceding columns;
///   n node (pods only), f free and t total (nodes only).
///
/// Rows are sorted by the first family and the first metric letter given.
#[derive(Parser, Debug)]
#[command(
    name = "kubectl-ps",
    author,
    version,
    verbatim_doc_comment,
    disable_help_flag = true,
    styles = get_styles()
)]
pub struct Cli {
    /// pods | nodes | namespaces
    #[arg(value_name = "SCOPE")]
    pub scope: Scope,

    /// Metric flags, e.g. `mcurp`
    #[arg(value_name = "FLAGS")]
    pub flags: String,

    /// All namespaces
    #[arg(short = 'A')]
    pub all_namespaces: bool,

    /// Select namespace
    #[arg(short = 'n', value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Reverse sort
    #[arg(short = 'r')]
    pub reverse: bool,

    /// Human-readable memory units (default)
    #[arg(short = 'h', overrides_with_all = ["mebibytes", "gibibytes", "bytes"])]
    pub human: bool,

    /// Memory in mebibytes
    #[arg(short = 'm', overrides_with_all = ["human", "gibibytes", "bytes"])]
    pub mebibytes: bool,

    /// Memory in gibibytes
    #[arg(short = 'g', overrides_with_all = ["human", "mebibytes", "bytes"])]
    pub gibibytes: bool,

    /// Memory in bytes
    #[arg(short = 'b', overrides_with_all = ["human", "mebibytes", "gibibytes"])]
    pub bytes: bool,

    /// Show a TOTAL row
    #[arg(short = 't', long)]
    pub total: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Unit mode from the last of `-h -m -g -b` given
    pub fn unit_mode(&self) -> UnitMode {
        if self.bytes {
            UnitMode::Bytes
        } else if self.gibibytes {
            UnitMode::Gibibytes
        } else if self.mebibytes {
            UnitMode::Mebibytes
        } else {
            UnitMode::Human
        }
    }
}

/// Set color and variants for help description
///
/// Thanks to [Praveen Perera](https://stackoverflow.com/a/76916424)
fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}
