//! Walk a [`Plan`] in order and hand each action to its reconciler.
use super::context::Context;
use super::plan::{ModulePlan, Plan, ResolvedAction};
use super::reconcile::{self, Outcome};
use super::summary::RunSummary;
use crate::config::{ActionKind, PackageList};
use crate::resources::package::{PackageInstaller, PackageResource, batch_install_packages};
use crate::resources::{Applicable, Resource, ResourceState};

/// Runs a plan: packages first, then every module in order.
pub struct Dispatcher<'a> {
    ctx: &'a Context,
    installer: Option<&'a dyn PackageInstaller>,
}

impl std::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("ctx", self.ctx)
            .field(
                "installer",
                &self.installer.map(|i| i.manager().to_string()),
            )
            .finish()
    }
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher that does not install packages.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            installer: None,
        }
    }

    /// Install the plan's packages with `installer`.
    #[must_use]
    pub const fn with_installer(mut self, installer: &'a dyn PackageInstaller) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Apply `plan`, returning the combined summary.
    #[must_use]
    pub fn run(&self, plan: &Plan) -> RunSummary {
        let mut summary = RunSummary::default();
        if let Some(installer) = self.installer {
            summary += self.install_packages(installer, &plan.packages);
        }
        for module in &plan.modules {
            summary += self.run_module(module);
        }
        summary
    }

    /// Remove every link of `plan` that still points at its source.
    #[must_use]
    pub fn unlink(&self, plan: &Plan) -> RunSummary {
        let mut summary = RunSummary::default();
        for module in &plan.modules {
            if module.skipped.is_some() {
                summary.modules_skipped += 1;
                continue;
            }
            self.ctx.log.stage(&format!("Unlink {}", module.name));
            summary.modules += 1;
            for action in module.actions_of(ActionKind::Link) {
                if let ResolvedAction::Link {
                    key,
                    source,
                    target,
                } = action
                {
                    let outcome = reconcile::unlink(self.ctx, source, target);
                    summary.record(ActionKind::Link, key, &outcome);
                }
            }
        }
        summary
    }

    fn run_module(&self, module: &ModulePlan) -> RunSummary {
        let mut summary = RunSummary::default();
        if let Some(reason) = &module.skipped {
            self.ctx
                .log
                .info(&format!("skipping module {}: {reason}", module.name));
            summary.modules_skipped += 1;
            return summary;
        }

        self.ctx.log.stage(&format!("Module {}", module.name));
        summary.modules += 1;
        if module.actions.is_empty() {
            self.ctx.log.debug("nothing to do");
        }
        for action in &module.actions {
            let outcome = dispatch(self.ctx, action);
            summary.record(action.kind(), action.key(), &outcome);
        }
        summary
    }

    /// Query each package, then install every missing one in one batch.
    fn install_packages(
        &self,
        installer: &dyn PackageInstaller,
        packages: &PackageList,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        if packages.is_empty() {
            return summary;
        }
        let log = &self.ctx.log;
        log.stage(&format!("Packages ({})", installer.manager()));

        let resources: Vec<PackageResource<'_>> = packages
            .as_slice()
            .iter()
            .map(|name| PackageResource::new(name.clone(), installer))
            .collect();
        let mut missing = Vec::new();
        for resource in &resources {
            match resource.current_state() {
                Ok(ResourceState::Correct) => {
                    log.debug(&format!("ok: {}", resource.description()));
                    summary.unchanged += 1;
                }
                Ok(_) => missing.push(resource),
                Err(e) => {
                    let message = format!("package {}: {e:#}", resource.name);
                    log.error(&message);
                    summary.record_error(message);
                }
            }
        }

        if missing.is_empty() {
            log.info(&format!("all {} packages already installed", summary.unchanged));
            return summary;
        }
        let names: Vec<&str> = missing.iter().map(|r| r.name.as_str()).collect();
        let count = u32::try_from(missing.len()).unwrap_or(u32::MAX);
        if self.ctx.dry_run {
            log.dry_run(&format!("would install: {}", names.join(" ")));
            summary.packages += count;
            return summary;
        }

        log.info(&format!("installing: {}", names.join(" ")));
        match batch_install_packages(&missing) {
            Ok(()) => summary.packages += count,
            Err(e) => {
                let message = format!("package installation ({}): {e:#}", installer.manager());
                log.error(&message);
                summary.record_error(message);
            }
        }
        summary
    }
}

/// Outcome of one action, for callers that reconcile outside a plan.
#[must_use]
pub fn dispatch(ctx: &Context, action: &ResolvedAction) -> Outcome {
    match action {
        ResolvedAction::Link { source, target, .. } => {
            reconcile::reconcile_link(ctx, source, target)
        }
        ResolvedAction::Copy { source, target, .. } => {
            reconcile::reconcile_copy(ctx, source, target)
        }
        ResolvedAction::Exec { script, args, .. } => reconcile::run_script(ctx, script, args),
    }
}
