use crate::apps::AppLocator;
use crate::config::Config;
use crate::db::HistoryStore;
use crate::error::Result;
use crate::executor::{Execution, Executor};
use crate::gate::{self, Confirm};
use crate::planner::{self, Inferred, PlanContext, PlanProvider};
use crate::router;
use crate::safety;
use crate::shortcuts::{normalize, ShortcutMap};
use crate::types::{Action, CommandPlan, Intent, Risk};
use crate::ui;
use std::io::Write;

#[derive(Debug)]
pub struct Outcome {
    pub risk: Risk,
    /// `None` when the plan only asked questions.
    pub execution: Option<Execution>,
}

/// One invocation: route, plan, classify, gate, execute, record.
pub struct Pipeline<'a> {
    config: &'a Config,
    shortcuts: &'a ShortcutMap,
    apps: &'a dyn AppLocator,
    provider: Option<&'a dyn PlanProvider>,
    executor: Executor,
    auto_approve: bool,
    track_usage: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        shortcuts: &'a ShortcutMap,
        apps: &'a dyn AppLocator,
        executor: Executor,
    ) -> Self {
        Self {
            config,
            shortcuts,
            apps,
            provider: None,
            executor,
            auto_approve: config.safety.auto_approve,
            track_usage: true,
        }
    }

    pub fn with_provider(mut self, provider: &'a dyn PlanProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn approve_all(mut self, yes: bool) -> Self {
        self.auto_approve |= yes;
        self
    }

    /// Record history rows only; usage counters stay untouched.
    pub fn without_usage(mut self) -> Self {
        self.track_usage = false;
        self
    }

    pub fn run_input<W: Write + Send>(
        &self,
        input: &str,
        store: &mut HistoryStore,
        confirm: &mut dyn Confirm,
        out: &mut W,
    ) -> Result<Outcome> {
        let route = router::route(input, self.shortcuts, self.apps)?;

        if route.fallback {
            if let Some(provider) = self.provider {
                log::debug!("no route for {:?}; asking planner", input);
                return match planner::infer(provider, input, &PlanContext::current())? {
                    Inferred::Plan(plan) => {
                        ui::print_plan(out, &plan)?;
                        self.run_plan(input, plan, Risk::Low, store, confirm, out)
                    }
                    Inferred::Intent(intent) => {
                        self.run_intent(input, intent, store, confirm, out)
                    }
                };
            }
        }

        self.run_intent(input, route.intent, store, confirm, out)
    }

    pub fn run_intent<W: Write + Send>(
        &self,
        input: &str,
        intent: Intent,
        store: &mut HistoryStore,
        confirm: &mut dyn Confirm,
        out: &mut W,
    ) -> Result<Outcome> {
        intent.validate()?;
        let assessed = intent
            .risk
            .unwrap_or(Risk::Low)
            .max(safety::assess(&intent));

        let template = match intent.action {
            Action::Search => self.config.search_template()?,
            _ => "",
        };
        let plan = planner::from_intent(&intent, template);

        // Only shell commands go through the pattern checks; the other
        // actions quote user text into a fixed `open` command.
        if intent.action == Action::RunShell {
            self.run_plan(input, plan, assessed, store, confirm, out)
        } else {
            self.approve_and_run(input, plan, assessed, store, confirm, out)
        }
    }

    /// Classify, gate and execute a plan, then record the attempt.
    /// `assessed` is any risk established before the plan existed.
    pub fn run_plan<W: Write + Send>(
        &self,
        input: &str,
        mut plan: CommandPlan,
        assessed: Risk,
        store: &mut HistoryStore,
        confirm: &mut dyn Confirm,
        out: &mut W,
    ) -> Result<Outcome> {
        safety::validate_safety(&mut plan)?;
        self.approve_and_run(input, plan, assessed, store, confirm, out)
    }

    fn approve_and_run<W: Write + Send>(
        &self,
        input: &str,
        plan: CommandPlan,
        assessed: Risk,
        store: &mut HistoryStore,
        confirm: &mut dyn Confirm,
        out: &mut W,
    ) -> Result<Outcome> {
        let risk = assessed.max(plan.max_risk());

        if plan.commands.is_empty() {
            writeln!(out, "no commands to execute.")?;
            return Ok(Outcome {
                risk,
                execution: None,
            });
        }

        let prompt = format!("Proceed with {} ({} risk)?", plan.intent, risk);
        gate::check(
            risk,
            self.config.threshold(),
            self.auto_approve,
            confirm,
            &prompt,
        )?;

        let result = self.executor.execute(&plan, out);
        let key = self.track_usage.then(|| normalize(input));
        let recorded = store.record(input, key.as_deref(), result.is_ok());

        let execution = result?;
        recorded?;
        Ok(Outcome {
            risk,
            execution: Some(execution),
        })
    }
}
