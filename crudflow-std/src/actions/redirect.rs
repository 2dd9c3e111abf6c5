//! Post-operation redirects.

use crudflow_core::{
    Action, ActionContext, EventName, Flow, Handled, Request, Subject, Url, text,
};

/// Request fields that override the redirect target, highest precedence first.
const OVERRIDES: [(Source, &str); 4] = [
    (Source::Data, "_redirect_url"),
    (Source::Query, "_redirect_url"),
    (Source::Data, "redirect_url"),
    (Source::Query, "redirect_url"),
];

#[derive(Clone, Copy)]
enum Source {
    Data,
    Query,
}

/// Resolves where an operation redirects to and performs the redirect.
///
/// The target is the first non-empty override field of the request, or the
/// caller's fallback. `beforeRedirect` listeners may rewrite the target or
/// stop the redirect altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectResolver {
    status: u16,
}

impl RedirectResolver {
    /// A resolver issuing `302 Found`.
    pub fn new() -> Self {
        Self { status: 302 }
    }

    /// A resolver issuing `status`.
    pub fn with_status(status: u16) -> Self {
        Self { status }
    }

    /// Redirect status.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The redirect target for `request`.
    pub fn resolve_url(&self, request: &Request, fallback: Url) -> Url {
        OVERRIDES
            .iter()
            .find_map(|(source, key)| {
                let value = match source {
                    Source::Data => request.data(key),
                    Source::Query => request.query(key),
                };
                value
                    .filter(|value| text::truthy(value))
                    .and_then(Url::from_value)
            })
            .unwrap_or(fallback)
    }

    /// Publish the target on `subject`, raise `beforeRedirect` and redirect.
    ///
    /// A stopped `beforeRedirect` answers with the host's current response.
    pub fn redirect(
        &self,
        action: &dyn Action,
        ctx: &ActionContext<'_>,
        subject: &mut Subject,
        fallback: Url,
    ) -> Flow<Handled> {
        subject.url = Some(self.resolve_url(ctx.request(), fallback));
        subject.status = Some(self.status);
        subject.exit = Some(true);

        ctx.trigger(action, EventName::BeforeRedirect, subject)?;
        if subject.is_stopped() {
            return Ok(Handled::Respond(ctx.host().response()));
        }

        let url = subject.url.clone().unwrap_or_else(|| Url::action("index"));
        let status = subject.status.unwrap_or(self.status);
        Ok(Handled::Respond(ctx.host().redirect(&url, status)))
    }
}

impl Default for RedirectResolver {
    fn default() -> Self {
        Self::new()
    }
}
