//! [`ModeResolver`]: longest-prefix-match mode routing (spec.md §4.2).

use tracing::warn;

use crate::error::{IgfsError, Result};
use crate::model::Mode;
use crate::path::Path;

/// Reserved prefixes pre-registered whenever a secondary FS is
/// configured; `/ignite/primary` is always registered.
pub const PRIMARY_PREFIX: &str = "/ignite/primary";
pub const PROXY_PREFIX: &str = "/ignite/proxy";
pub const SYNC_PREFIX: &str = "/ignite/sync";
pub const ASYNC_PREFIX: &str = "/ignite/async";

struct PrefixRule {
    prefix: Path,
    mode: Mode,
}

/// Maps paths to a [`Mode`] by longest matching prefix, falling back to a
/// configured default.
pub struct ModeResolver {
    default_mode: Mode,
    rules: Vec<PrefixRule>,
    has_secondary: bool,
}

impl ModeResolver {
    /// Builds a resolver. `user_prefixes` are `(prefix, mode)` pairs from
    /// configuration; any colliding with a reserved prefix is logged and
    /// skipped (spec.md §4.2, Open Question (c) resolved as longest-match
    /// with reserved prefixes always winning ties at their own path).
    pub fn new(default_mode: Mode, has_secondary: bool, user_prefixes: Vec<(Path, Mode)>) -> Result<Self> {
        if !has_secondary && default_mode == Mode::Proxy {
            return Err(IgfsError::InvalidArgument(
                "default mode cannot be PROXY when no secondary file system is configured".into(),
            ));
        }

        let mut rules = Vec::new();
        rules.push(PrefixRule { prefix: Path::parse(PRIMARY_PREFIX).unwrap(), mode: Mode::Primary });
        if has_secondary {
            rules.push(PrefixRule { prefix: Path::parse(PROXY_PREFIX).unwrap(), mode: Mode::Proxy });
            rules.push(PrefixRule { prefix: Path::parse(SYNC_PREFIX).unwrap(), mode: Mode::DualSync });
            rules.push(PrefixRule { prefix: Path::parse(ASYNC_PREFIX).unwrap(), mode: Mode::DualAsync });
        }
        let reserved: Vec<String> = rules.iter().map(|r| r.prefix.as_str().to_string()).collect();

        for (prefix, mode) in user_prefixes {
            if reserved.iter().any(|r| r == prefix.as_str()) {
                warn!(prefix = %prefix, "user-configured mode prefix collides with a reserved prefix, skipping");
                continue;
            }
            let collapsed = if has_secondary { mode } else { collapse_without_secondary(mode) };
            rules.push(PrefixRule { prefix, mode: collapsed });
        }

        Ok(Self { default_mode: collapse_default(default_mode, has_secondary), rules, has_secondary })
    }

    /// Longest matching prefix wins; ties are impossible since prefixes
    /// are unique path strings.
    pub fn resolve_mode(&self, path: &Path) -> Mode {
        let mut best: Option<(&Path, Mode)> = None;
        for rule in &self.rules {
            if path.starts_with_prefix(&rule.prefix) {
                let is_longer = best.map(|(p, _)| rule.prefix.as_str().len() > p.as_str().len()).unwrap_or(true);
                if is_longer {
                    best = Some((&rule.prefix, rule.mode));
                }
            }
        }
        best.map(|(_, mode)| mode).unwrap_or(self.default_mode)
    }

    /// The set of modes reachable under `path`: its own resolved mode,
    /// plus any child prefix mode strictly nested under it. Used to
    /// decide whether listings/deletes must also consult the secondary
    /// FS.
    pub fn resolve_children_modes(&self, path: &Path) -> Vec<Mode> {
        let mut modes = vec![self.resolve_mode(path)];
        for rule in &self.rules {
            if rule.prefix.is_sub_directory_of(path) && !modes.contains(&rule.mode) {
                modes.push(rule.mode);
            }
        }
        modes
    }

    pub fn has_secondary(&self) -> bool {
        self.has_secondary
    }
}

fn collapse_without_secondary(_mode: Mode) -> Mode {
    Mode::Primary
}

fn collapse_default(mode: Mode, has_secondary: bool) -> Mode {
    if has_secondary {
        mode
    } else {
        collapse_without_secondary(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn reserved_prefixes_resolve_without_secondary() {
        let resolver = ModeResolver::new(Mode::Primary, false, vec![]).unwrap();
        assert_eq!(resolver.resolve_mode(&p("/ignite/primary/a")), Mode::Primary);
        assert_eq!(resolver.resolve_mode(&p("/anything")), Mode::Primary);
    }

    #[test]
    fn default_cannot_be_proxy_without_secondary() {
        assert!(ModeResolver::new(Mode::Proxy, false, vec![]).is_err());
    }

    #[test]
    fn longest_prefix_wins() {
        let resolver = ModeResolver::new(
            Mode::Primary,
            true,
            vec![(p("/data"), Mode::DualSync), (p("/data/hot"), Mode::DualAsync)],
        )
        .unwrap();
        assert_eq!(resolver.resolve_mode(&p("/data/hot/x")), Mode::DualAsync);
        assert_eq!(resolver.resolve_mode(&p("/data/cold/x")), Mode::DualSync);
        assert_eq!(resolver.resolve_mode(&p("/elsewhere")), Mode::Primary);
    }

    #[test]
    fn user_prefix_colliding_with_reserved_is_skipped() {
        let resolver = ModeResolver::new(
            Mode::Primary,
            true,
            vec![(p(PROXY_PREFIX), Mode::DualSync)],
        )
        .unwrap();
        assert_eq!(resolver.resolve_mode(&p(PROXY_PREFIX)), Mode::Proxy);
    }

    #[test]
    fn without_secondary_non_proxy_collapses_to_primary() {
        let resolver = ModeResolver::new(Mode::Primary, false, vec![(p("/data"), Mode::DualSync)]).unwrap();
        assert_eq!(resolver.resolve_mode(&p("/data/x")), Mode::Primary);
    }

    #[test]
    fn without_secondary_user_proxy_prefix_also_collapses_to_primary() {
        let resolver = ModeResolver::new(Mode::Primary, false, vec![(p("/legacy"), Mode::Proxy)]).unwrap();
        assert_eq!(resolver.resolve_mode(&p("/legacy/x")), Mode::Primary);
    }

    #[test]
    fn children_modes_include_nested_prefixes() {
        let resolver = ModeResolver::new(Mode::Primary, true, vec![(p("/data/hot"), Mode::DualAsync)]).unwrap();
        let modes = resolver.resolve_children_modes(&p("/data"));
        assert!(modes.contains(&Mode::Primary));
        assert!(modes.contains(&Mode::DualAsync));
    }
}
