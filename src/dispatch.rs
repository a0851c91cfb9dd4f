//! Reducer dispatch for draft state.
//!
//! Two flavours share this module. [`HandlerTable`] maps action names to
//! handlers and decides what an unmapped name means through an
//! [`UnknownActionPolicy`]. [`Reducer`] is the closed alternative: the action
//! is an enum and the compiler checks that every variant is handled.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// A named action with an optional payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action<P> {
    pub name: Cow<'static, str>,
    pub payload: Option<P>,
}

impl<P> Action<P> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(name: impl Into<Cow<'static, str>>, payload: P) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }
}

/// What dispatching an unmapped action name does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownActionPolicy {
    /// Leave the draft untouched and report nothing.
    #[default]
    Ignore,
    /// Leave the draft untouched and log a warning.
    Warn,
    /// Return [`DispatchError::UnknownAction`].
    Reject,
}

impl UnknownActionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            UnknownActionPolicy::Ignore => "ignore",
            UnknownActionPolicy::Warn => "warn",
            UnknownActionPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for UnknownActionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action policy `{0}` (expected ignore, warn or reject)")]
pub struct ParsePolicyError(String);

impl FromStr for UnknownActionPolicy {
    type Err = ParsePolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(UnknownActionPolicy::Ignore),
            "warn" => Ok(UnknownActionPolicy::Warn),
            "reject" => Ok(UnknownActionPolicy::Reject),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no handler registered for action `{name}`")]
    UnknownAction { name: String },
}

type Handler<S, P> = Box<dyn Fn(&mut S, Option<P>) + Send + Sync>;

/// Name-keyed dispatch table over draft state `S` with payload `P`.
pub struct HandlerTable<S, P> {
    handlers: HashMap<Cow<'static, str>, Handler<S, P>>,
    policy: UnknownActionPolicy,
}

impl<S, P> Default for HandlerTable<S, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P> fmt::Debug for HandlerTable<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("HandlerTable")
            .field("actions", &names)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S, P> HandlerTable<S, P> {
    pub fn new() -> Self {
        Self::with_policy(UnknownActionPolicy::default())
    }

    pub fn with_policy(policy: UnknownActionPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            policy,
        }
    }

    /// Register `handler` for `name`, replacing any earlier handler.
    pub fn on<F>(mut self, name: impl Into<Cow<'static, str>>, handler: F) -> Self
    where
        F: Fn(&mut S, Option<P>) + Send + Sync + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn register<F>(&mut self, name: impl Into<Cow<'static, str>>, handler: F)
    where
        F: Fn(&mut S, Option<P>) + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn set_policy(&mut self, policy: UnknownActionPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> UnknownActionPolicy {
        self.policy
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|name| name.as_ref())
    }

    /// Run the handler registered for `action.name` against `draft`.
    pub fn dispatch(&self, draft: &mut S, action: Action<P>) -> Result<Dispatch, DispatchError> {
        let Some(handler) = self.handlers.get(action.name.as_ref()) else {
            return match self.policy {
                UnknownActionPolicy::Ignore => Ok(Dispatch::Ignored),
                UnknownActionPolicy::Warn => {
                    warn!(action = %action.name, "ignoring unknown draft action");
                    Ok(Dispatch::Ignored)
                }
                UnknownActionPolicy::Reject => Err(DispatchError::UnknownAction {
                    name: action.name.into_owned(),
                }),
            };
        };
        handler(draft, action.payload);
        Ok(Dispatch::Applied)
    }
}

/// Draft state updated by a closed set of actions.
pub trait Reducer {
    type Action;

    fn reduce(&mut self, action: Self::Action);
}

pub fn dispatch_typed<R: Reducer>(draft: &mut R, action: R::Action) {
    draft.reduce(action);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        value: i64,
    }

    fn table(policy: UnknownActionPolicy) -> HandlerTable<Counter, i64> {
        HandlerTable::with_policy(policy)
            .on("increment", |draft: &mut Counter, by| {
                draft.value += by.unwrap_or(1)
            })
            .on("reset", |draft: &mut Counter, _| draft.value = 0)
    }

    #[test]
    fn known_action_mutates_draft() {
        let table = table(UnknownActionPolicy::Ignore);
        let mut draft = Counter::default();

        assert_eq!(
            table.dispatch(&mut draft, Action::with_payload("increment", 5)),
            Ok(Dispatch::Applied)
        );
        assert_eq!(
            table.dispatch(&mut draft, Action::new("increment")),
            Ok(Dispatch::Applied)
        );
        assert_eq!(draft.value, 6);
    }

    #[test]
    fn unknown_action_is_a_silent_no_op_by_default() {
        let table = table(UnknownActionPolicy::default());
        let mut draft = Counter { value: 3 };

        let outcome = table.dispatch(&mut draft, Action::with_payload("explode", 9));

        assert_eq!(outcome, Ok(Dispatch::Ignored));
        assert_eq!(draft, Counter { value: 3 });
    }

    #[test]
    fn warn_policy_still_leaves_draft_untouched() {
        let table = table(UnknownActionPolicy::Warn);
        let mut draft = Counter { value: 3 };

        assert_eq!(
            table.dispatch(&mut draft, Action::new("explode")),
            Ok(Dispatch::Ignored)
        );
        assert_eq!(draft.value, 3);
    }

    #[test]
    fn reject_policy_reports_the_name() {
        let table = table(UnknownActionPolicy::Reject);
        let mut draft = Counter { value: 3 };

        let err = table
            .dispatch(&mut draft, Action::new("explode"))
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::UnknownAction {
                name: "explode".to_string()
            }
        );
        assert_eq!(draft.value, 3);
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("Warn".parse(), Ok(UnknownActionPolicy::Warn));
        assert_eq!(" reject ".parse(), Ok(UnknownActionPolicy::Reject));
        assert!("loud".parse::<UnknownActionPolicy>().is_err());
    }

    enum CounterAction {
        Add(i64),
        Reset,
    }

    impl Reducer for Counter {
        type Action = CounterAction;

        fn reduce(&mut self, action: Self::Action) {
            match action {
                CounterAction::Add(by) => self.value += by,
                CounterAction::Reset => self.value = 0,
            }
        }
    }

    #[test]
    fn typed_dispatch_runs_reducer() {
        let mut draft = Counter::default();
        dispatch_typed(&mut draft, CounterAction::Add(4));
        assert_eq!(draft.value, 4);
        dispatch_typed(&mut draft, CounterAction::Reset);
        assert_eq!(draft.value, 0);
    }
}
