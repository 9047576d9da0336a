//! Resolve normalised [`ConfigNode`] trees against the machine identity.
//!
//! Merge order at every selector, each later step overriding earlier ones
//! key-for-key:
//!
//! 1. `all` / `common` children, in declaration order;
//! 2. every platform entry naming the current OS (or the group `default`
//!    when none did);
//! 3. every hostname entry naming the current host (or its `default`);
//! 4. `host-<hostname>` children.
use super::node::{ConfigNode, Merge, SelectorGroup};
use crate::platform::Platform;

/// Flatten `node` into a single leaf for `platform`.
#[must_use]
pub fn resolve<T: Merge + Default>(node: &ConfigNode<T>, platform: &Platform) -> T {
    let mut acc = T::default();
    resolve_into(node, platform, &mut acc);
    acc
}

fn resolve_into<T: Merge>(node: &ConfigNode<T>, platform: &Platform, acc: &mut T) {
    match node {
        ConfigNode::Empty => {}
        ConfigNode::Leaf(leaf) => acc.merge(leaf),
        ConfigNode::Selector(selector) => {
            for child in &selector.all {
                resolve_into(child, platform, acc);
            }
            resolve_group(
                &selector.platforms,
                |token| platform.os.matches(token),
                platform,
                acc,
            );
            resolve_group(
                &selector.hostnames,
                |token| token == platform.hostname,
                platform,
                acc,
            );
            for (host, child) in &selector.pinned_hosts {
                if *host == platform.hostname {
                    resolve_into(child, platform, acc);
                }
            }
        }
    }
}

fn resolve_group<T: Merge>(
    group: &SelectorGroup<T>,
    matches: impl Fn(&str) -> bool,
    platform: &Platform,
    acc: &mut T,
) {
    let mut matched = false;
    for entry in &group.entries {
        if entry.tokens.iter().any(|t| matches(t)) {
            matched = true;
            resolve_into(&entry.node, platform, acc);
        }
    }
    if !matched && let Some(default) = &group.default {
        resolve_into(default, platform, acc);
    }
}
