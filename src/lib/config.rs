use crate::lib::cli::Cli;
use crate::lib::spec::{ColumnSpec, Scope};
use crate::lib::units::UnitMode;
use crate::UsageError;

#[derive(Clone, Debug)]
pub struct Config {
    pub scope: Scope,
    pub columns: ColumnSpec,
    pub all_namespaces: bool,
    pub namespace: Option<String>,
    pub reverse: bool,
    pub units: UnitMode,
}

impl Config {
    pub fn new(
        scope: Scope,
        columns: ColumnSpec,
        all_namespaces: bool,
        namespace: Option<String>,
        reverse: bool,
        units: UnitMode,
    ) -> Self {
        Self {
            scope,
            columns,
            all_namespaces,
            namespace,
            reverse,
            units,
        }
    }

    /// Validate the flag string against the scope and collect the options
    pub fn from_cli(cli: &Cli) -> Result<Self, UsageError> {
        let columns = ColumnSpec::parse(&cli.flags, cli.scope)?.with_total(cli.total);

        Ok(Self::new(
            cli.scope,
            columns,
            cli.all_namespaces,
            cli.namespace.clone(),
            cli.reverse,
            cli.unit_mode(),
        ))
    }

    /// Namespace pods are listed from: `None` for all namespaces, otherwise
    /// the `-n` override or the current kubeconfig namespace
    pub fn namespace_selector<'a>(&'a self, current: &'a str) -> Option<&'a str> {
        if self.all_namespaces {
            None
        } else {
            Some(self.namespace.as_deref().unwrap_or(current))
        }
    }
}
