//! Response templating.
//!
//! Response text may contain `${name}` placeholders. A placeholder resolves to
//! the user's slot `name` if set, otherwise to the metadata field `name`
//! (`bot_name`, `version`). Unknown placeholders are kept verbatim.

use crate::{ConversationContext, Metadata};
use std::borrow::Cow;

pub(crate) fn render<'a>(content: &'a str, ctx: &ConversationContext, metadata: &Metadata) -> Cow<'a, str> {
    if !content.contains("${") {
        return Cow::Borrowed(content);
    }

    regex!(r"\$\{([A-Za-z0-9_.-]+)\}").replace_all(content, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        ctx.slot(name).or_else(|| metadata.get(name)).map(str::to_string).unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_slots_before_metadata() {
        let mut ctx = ConversationContext::new();
        ctx.slots.insert("name".into(), "Lin".into());
        ctx.slots.insert("version".into(), "slot wins".into());
        let metadata = Metadata { bot_name: Some("Ava".into()), version: Some("1.0".into()) };

        assert_eq!(render("Hi ${name}, I am ${bot_name}", &ctx, &metadata), "Hi Lin, I am Ava");
        assert_eq!(render("${version}", &ctx, &metadata), "slot wins");
    }

    #[test]
    fn keeps_unknown_placeholders_and_plain_text() {
        let ctx = ConversationContext::new();
        let metadata = Metadata::default();

        assert_eq!(render("order ${order_id} pending", &ctx, &metadata), "order ${order_id} pending");
        assert!(matches!(render("plain", &ctx, &metadata), Cow::Borrowed("plain")));
    }
}
