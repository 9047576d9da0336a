#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing
)]
//! Integration tests for plan resolution: which entries apply to which
//! machine, and in what order.
//!
//! Plans are rendered with [`Plan::render`](homelink::engine::Plan::render)
//! and compared against inline snapshots.

mod common;

use common::TestContextBuilder;
use homelink::commands::show;
use homelink::platform::{Os, Platform};

const LAYERED: &str = "\
links:
  common:
    a: ~/a-common
    shared: ~/shared
  platforms:
    linux:
      a: ~/a-linux
    linux,macos:
      unix: ~/.unix
    default:
      other: ~/other
  hostnames:
    work:
      a: ~/a-work
    default:
      a: ~/a-default
";

#[test]
fn hostname_default_overrides_platform_overrides_common() {
    let ctx = TestContextBuilder::new().config(LAYERED).build();

    insta::assert_snapshot!(ctx.plan().render(), @r"
    platform: box on linux
    module homelink (homelink.yaml)
      link ~/a-default -> a
      link ~/shared -> shared
      link ~/.unix -> unix
    ");
}

#[test]
fn matching_hostname_wins_and_platform_default_applies_elsewhere() {
    let ctx = TestContextBuilder::new().config(LAYERED).build();

    let plan = ctx.plan_for(&Platform::new(Os::Windows, "work"));

    insta::assert_snapshot!(plan.render(), @r"
    platform: work on windows
    module homelink (homelink.yaml)
      link ~/a-work -> a
      link ~/shared -> shared
      link ~/other -> other
    ");
}

#[test]
fn multi_platform_key_matches_each_listed_platform() {
    let ctx = TestContextBuilder::new().config(LAYERED).build();

    let plan = ctx.plan_for(&Platform::new(Os::Macos, "box"));

    let keys: Vec<&str> = plan.modules[0].actions.iter().map(|a| a.key()).collect();
    assert!(keys.contains(&"unix"));
    assert!(!keys.contains(&"other"));
}

#[test]
fn pinned_host_key_merges_last() {
    let ctx = TestContextBuilder::new()
        .config(
            "\
common:
  gitconfig: ~/.gitconfig
hostnames:
  box:
    gitconfig: ~/.gitconfig-hosts
host-box:
  gitconfig: ~/.gitconfig-pinned
",
        )
        .build();

    insta::assert_snapshot!(ctx.plan().render(), @r"
    platform: box on linux
    module homelink (homelink.yaml)
      link ~/.gitconfig-pinned -> gitconfig
    ");
}

#[test]
fn modules_sections_and_packages() {
    let ctx = TestContextBuilder::new()
        .config("links:\n  bashrc: ~/.bashrc\npackages:\n  common: [git, curl]\n")
        .module(
            "editor",
            "\
links:
  vimrc: ~/.vimrc
  install.sh:
    type: exec
    args: [--quiet]
copy:
  linux:
    settings.json: ~/.config/Code/User/settings.json
packages:
  linux: [neovim, git]
  windows: [Neovim.Neovim]
",
        )
        .module(
            "work",
            "hostnames: [work-laptop]\nlinks:\n  vpn: ~/.vpn\npackages: [openvpn]\n",
        )
        .build();

    insta::assert_snapshot!(ctx.plan().render(), @r"
    platform: box on linux
    module homelink (homelink.yaml)
      link ~/.bashrc -> bashrc
    module editor (modules/editor/module.yaml)
      link ~/.vimrc -> modules/editor/vimrc
      copy ~/.config/Code/User/settings.json <= modules/editor/settings.json
      exec modules/editor/install.sh --quiet
    module work (modules/work/module.yaml): skipped, limited to hosts [work-laptop], this is 'box'
    packages: git, curl, neovim
    ");
}

#[test]
fn json_plan_lists_resolved_actions() {
    let ctx = TestContextBuilder::new()
        .config("links:\n  bashrc: ~/.bashrc\n")
        .build();

    let text = show::render(&ctx.plan(), true).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    let action = &json["modules"][0]["actions"][0];
    assert_eq!(action["kind"], "link");
    assert_eq!(action["key"], "bashrc");
    assert_eq!(
        action["target"],
        ctx.home().join(".bashrc").display().to_string()
    );
}

#[test]
fn malformed_entries_are_dropped_with_warnings() {
    let ctx = TestContextBuilder::new()
        .config(
            "\
links:
  good: ~/good
  bad:
    type: teleport
    target: ~/bad
  nothing:
    type: copy
",
        )
        .build();

    let config = ctx.load_config();
    let plan = ctx.plan();

    assert_eq!(plan.action_count(), 1);
    assert_eq!(config.warnings.len(), 2);
}
