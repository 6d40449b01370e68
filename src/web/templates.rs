//! Page templates and the navigation bar.

use askama::Template;

/// Navigation entries as `(href, label)`.
const NAV: [(&str, &str); 3] = [("/", "Home"), ("/features", "Features"), ("/help", "Help")];

/// One navigation bar link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Navigation bar for a request path. A link is active only on an exact
/// path match.
#[must_use]
pub fn nav_links(path: &str) -> Vec<NavLink> {
    NAV.iter()
        .map(|&(href, label)| NavLink {
            href,
            label,
            active: href == path,
        })
        .collect()
}

/// A row in the help page command table.
#[derive(Debug, Clone, Copy)]
pub(super) struct CommandRow {
    pub command: &'static str,
    pub description: &'static str,
}

pub(super) const COMMANDS: [CommandRow; 11] = [
    CommandRow { command: "/start", description: "Start the bot and see the welcome message" },
    CommandRow { command: "/connect", description: "Find an anonymous chat partner" },
    CommandRow { command: "/disconnect", description: "End the current conversation or cancel a search" },
    CommandRow { command: "/reveal", description: "Ask your partner to exchange identities" },
    CommandRow { command: "/invite", description: "Get an invite link for the current chat" },
    CommandRow { command: "/topic", description: "Pick a topic to be matched on" },
    CommandRow { command: "/group", description: "Create or browse group chats" },
    CommandRow { command: "/mode", description: "Switch between one-on-one, topic and group chat" },
    CommandRow { command: "/leave", description: "Leave the current group chat" },
    CommandRow { command: "/mood", description: "Send a mood reaction to your partner" },
    CommandRow { command: "/broadcast <message>", description: "Send a message to every user (admins only)" },
];

#[derive(Template)]
#[template(path = "index.html")]
pub(super) struct IndexPage {
    pub nav: Vec<NavLink>,
}

#[derive(Template)]
#[template(path = "features.html")]
pub(super) struct FeaturesPage {
    pub nav: Vec<NavLink>,
}

#[derive(Template)]
#[template(path = "help.html")]
pub(super) struct HelpPage {
    pub nav: Vec<NavLink>,
    pub commands: &'static [CommandRow],
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub(super) struct NotFoundPage {
    pub nav: Vec<NavLink>,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_link_active_on_known_paths() {
        for (href, _) in NAV {
            let links = nav_links(href);
            let active: Vec<_> = links.iter().filter(|l| l.active).map(|l| l.href).collect();
            assert_eq!(active, vec![href]);
        }
    }

    #[test]
    fn test_no_prefix_matching() {
        assert!(nav_links("/help/").iter().all(|l| !l.active));
        assert!(nav_links("/features/x").iter().all(|l| !l.active));
        assert!(nav_links("").iter().all(|l| !l.active));
    }

    #[test]
    fn test_help_lists_required_commands() {
        let page = HelpPage {
            nav: nav_links("/help"),
            commands: &COMMANDS,
        };
        let html = page.render().unwrap();
        for command in ["/start", "/connect", "/disconnect", "/reveal", "/invite"] {
            assert!(html.contains(&format!("<code>{command}</code>")), "{command}");
        }
        assert!(html.contains("<code>/broadcast &#60;message&#62;</code>"));
    }
}
