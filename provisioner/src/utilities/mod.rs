//! Built-in utility registries, one per `install` sub-command.

pub mod cli;
pub mod k8s;
pub mod system;

use crate::installer::Utility;
use std::collections::BTreeMap;

pub use cli::cli_utilities;
pub use k8s::k8s_utilities;
pub use system::system_utilities;

/// Key a list of utilities by display name.
///
/// Every entry must carry the source its `active_source` names; debug builds
/// panic on a misconfigured entry and installs reject it before any step runs.
pub(crate) fn registry(utilities: impl IntoIterator<Item = Utility>) -> BTreeMap<String, Utility> {
    utilities
        .into_iter()
        .inspect(|utility| {
            debug_assert!(
                utility.validate().is_ok(),
                "misconfigured utility {}: no {} source",
                utility.display_name,
                utility.active_source
            );
        })
        .map(|utility| (utility.display_name.clone(), utility))
        .collect()
}
