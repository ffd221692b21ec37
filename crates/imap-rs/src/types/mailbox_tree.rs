//! Mailbox hierarchy tree built from LIST/LSUB responses.
//!
//! A [`MailboxNode`] is a recursive tree rooted at an anonymous node with
//! `root: true`; children are keyed by their encoded path so repeated
//! `ensure_path` calls for the same mailbox return the same node.

use super::mailbox::MailboxAttribute;
use super::modified_utf7;

/// A single mailbox in the hierarchy, or the anonymous tree root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailboxNode {
    /// Decoded (human-readable) mailbox name; empty for the root.
    pub name: String,
    /// Hierarchy delimiter reported by the server, if any.
    pub delimiter: Option<char>,
    /// Encoded path as it appears on the wire, joined by `delimiter`.
    pub path: String,
    /// Child nodes, in discovery order.
    pub children: Vec<MailboxNode>,
    /// LIST attributes for this mailbox, if it has been listed.
    pub flags: Vec<MailboxAttribute>,
    /// Whether this node has been returned by a LIST command.
    pub listed: bool,
    /// Whether this node has been returned by an LSUB command.
    pub subscribed: bool,
    /// Inferred or server-asserted special-use role, if any.
    pub special_use: Option<MailboxAttribute>,
    /// True only for the anonymous tree root.
    pub root: bool,
}

impl MailboxNode {
    /// Creates a fresh anonymous tree root.
    #[must_use]
    pub fn root() -> Self {
        Self {
            root: true,
            ..Self::default()
        }
    }

    /// Walks (creating as needed) the child chain for `path`, split on
    /// `delimiter`. Each segment's `name` is modified-UTF-7-decoded; the
    /// returned node's `path` is the original encoded prefix.
    ///
    /// Re-invoking with the same `path` returns the existing node rather
    /// than creating a duplicate sibling.
    pub fn ensure_path(&mut self, path: &str, delimiter: Option<char>) -> &mut Self {
        let Some(delim) = delimiter else {
            return self.ensure_child(path, path, None);
        };

        let mut current = self;
        let mut prefix = String::new();
        for (i, segment) in path.split(delim).enumerate() {
            if i > 0 {
                prefix.push(delim);
            }
            prefix.push_str(segment);
            current = current.ensure_child(segment, &prefix, Some(delim));
        }
        current
    }

    fn ensure_child(&mut self, encoded_name: &str, encoded_path: &str, delimiter: Option<char>) -> &mut Self {
        if let Some(idx) = self.children.iter().position(|c| c.path == encoded_path) {
            return &mut self.children[idx];
        }

        let decoded_name = modified_utf7::decode(encoded_name.as_bytes())
            .unwrap_or_else(|| encoded_name.to_string());

        self.children.push(Self {
            name: decoded_name,
            delimiter,
            path: encoded_path.to_string(),
            children: Vec::new(),
            flags: Vec::new(),
            listed: false,
            subscribed: false,
            special_use: None,
            root: false,
        });
        self.children
            .last_mut()
            .expect("just pushed")
    }
}

/// The RFC 6154 special-use flags that `check_special_use` recognizes on a
/// server that advertises the `SPECIAL-USE` capability.
const SERVER_ASSERTED_SPECIAL_USE: &[MailboxAttribute] = &[
    MailboxAttribute::All,
    MailboxAttribute::Archive,
    MailboxAttribute::Drafts,
    MailboxAttribute::Flagged,
    MailboxAttribute::Junk,
    MailboxAttribute::Sent,
    MailboxAttribute::Trash,
];

/// Built-in multilingual dictionary of common folder names, used to infer
/// special-use roles on servers that do not advertise `SPECIAL-USE`.
///
/// Entries are `(lowercased name, inferred role)`. Kept verbatim as a
/// process-lifetime constant; do not reformat or reorder per-locale groups.
const SPECIAL_USE_DICTIONARY: &[(&str, MailboxAttribute)] = &[
    // Sent
    ("sent", MailboxAttribute::Sent),
    ("sent items", MailboxAttribute::Sent),
    ("sent mail", MailboxAttribute::Sent),
    ("sentmail", MailboxAttribute::Sent),
    ("gesendet", MailboxAttribute::Sent),
    ("gesendete objekte", MailboxAttribute::Sent),
    ("envoyes", MailboxAttribute::Sent),
    ("éléments envoyés", MailboxAttribute::Sent),
    ("elementos enviados", MailboxAttribute::Sent),
    ("enviados", MailboxAttribute::Sent),
    ("inviati", MailboxAttribute::Sent),
    ("verzonden", MailboxAttribute::Sent),
    ("verzonden items", MailboxAttribute::Sent),
    ("skickat", MailboxAttribute::Sent),
    ("sendt", MailboxAttribute::Sent),
    ("saadetud", MailboxAttribute::Sent),
    ("bidalita", MailboxAttribute::Sent),
    ("отправленные", MailboxAttribute::Sent),
    ("wysłane", MailboxAttribute::Sent),
    ("已发送邮件", MailboxAttribute::Sent),
    ("送信済みメール", MailboxAttribute::Sent),
    // Trash
    ("trash", MailboxAttribute::Trash),
    ("deleted items", MailboxAttribute::Trash),
    ("deleted messages", MailboxAttribute::Trash),
    ("papierkorb", MailboxAttribute::Trash),
    ("corbeille", MailboxAttribute::Trash),
    ("papelera", MailboxAttribute::Trash),
    ("elementos eliminados", MailboxAttribute::Trash),
    ("cestino", MailboxAttribute::Trash),
    ("prullenbak", MailboxAttribute::Trash),
    ("papperskorg", MailboxAttribute::Trash),
    ("søppelpost", MailboxAttribute::Trash),
    ("prügikast", MailboxAttribute::Trash),
    ("корзина", MailboxAttribute::Trash),
    ("kosz", MailboxAttribute::Trash),
    ("已删除邮件", MailboxAttribute::Trash),
    ("ゴミ箱", MailboxAttribute::Trash),
    // Junk / Spam
    ("junk", MailboxAttribute::Junk),
    ("spam", MailboxAttribute::Junk),
    ("junk e-mail", MailboxAttribute::Junk),
    ("bulk mail", MailboxAttribute::Junk),
    ("unerwünscht", MailboxAttribute::Junk),
    ("indésirables", MailboxAttribute::Junk),
    ("no deseado", MailboxAttribute::Junk),
    ("posta indesiderata", MailboxAttribute::Junk),
    ("ongewenst", MailboxAttribute::Junk),
    ("skräppost", MailboxAttribute::Junk),
    ("søppel", MailboxAttribute::Junk),
    ("rämpspost", MailboxAttribute::Junk),
    ("ogurk", MailboxAttribute::Junk),
    ("ogurki", MailboxAttribute::Junk),
    ("спам", MailboxAttribute::Junk),
    // Drafts
    ("drafts", MailboxAttribute::Drafts),
    ("entwürfe", MailboxAttribute::Drafts),
    ("brouillons", MailboxAttribute::Drafts),
    ("borradores", MailboxAttribute::Drafts),
    ("bozze", MailboxAttribute::Drafts),
    ("concepten", MailboxAttribute::Drafts),
    ("utkast", MailboxAttribute::Drafts),
    ("kladden", MailboxAttribute::Drafts),
    ("mustandid", MailboxAttribute::Drafts),
    ("черновики", MailboxAttribute::Drafts),
    ("szkice", MailboxAttribute::Drafts),
    ("草稿", MailboxAttribute::Drafts),
    ("下書き", MailboxAttribute::Drafts),
];

/// Infers or confirms `node`'s special-use role.
///
/// When `special_use_capable` is true (the server advertised `SPECIAL-USE`),
/// `node.flags` is scanned against the RFC 6154 set and the first match
/// wins. Otherwise `node.name` (lowercased, trimmed) is looked up in the
/// built-in multilingual dictionary.
pub fn check_special_use(node: &mut MailboxNode, special_use_capable: bool) {
    if special_use_capable {
        if let Some(found) = node
            .flags
            .iter()
            .find(|f| SERVER_ASSERTED_SPECIAL_USE.contains(*f))
        {
            node.special_use = Some(found.clone());
        }
        return;
    }

    let key = node.name.trim().to_lowercase();
    if let Some((_, role)) = SPECIAL_USE_DICTIONARY.iter().find(|(name, _)| *name == key) {
        node.flags.push(role.clone());
        node.special_use = Some(role.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_path_creates_nested_nodes() {
        let mut tree = MailboxNode::root();
        let leaf = tree.ensure_path("hello/world", Some('/'));
        assert_eq!(leaf.name, "world");
        assert_eq!(leaf.path, "hello/world");
        assert_eq!(leaf.delimiter, Some('/'));

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "hello");
        assert_eq!(tree.children[0].children.len(), 1);
    }

    #[test]
    fn ensure_path_is_idempotent_by_path() {
        let mut tree = MailboxNode::root();
        tree.ensure_path("hello/world", Some('/'));
        tree.ensure_path("hello/world", Some('/'));

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children.len(), 1);
    }

    #[test]
    fn ensure_path_decodes_segment_names() {
        let mut tree = MailboxNode::root();
        let leaf = tree.ensure_path("B&APw-ro", None);
        assert_eq!(leaf.name, "Büro");
        assert_eq!(leaf.path, "B&APw-ro");
    }

    #[test]
    fn special_use_server_asserted_wins() {
        let mut node = MailboxNode {
            name: "Stuff".to_string(),
            flags: vec![MailboxAttribute::HasNoChildren, MailboxAttribute::Sent],
            ..MailboxNode::default()
        };
        check_special_use(&mut node, true);
        assert_eq!(node.special_use, Some(MailboxAttribute::Sent));
    }

    #[test]
    fn special_use_heuristic_matches_dictionary() {
        let mut node = MailboxNode {
            name: "  Papierkorb  ".to_string(),
            ..MailboxNode::default()
        };
        check_special_use(&mut node, false);
        assert_eq!(node.special_use, Some(MailboxAttribute::Trash));
        assert!(node.flags.contains(&MailboxAttribute::Trash));
    }

    #[test]
    fn special_use_heuristic_no_match_leaves_node_untouched() {
        let mut node = MailboxNode {
            name: "Projects".to_string(),
            ..MailboxNode::default()
        };
        check_special_use(&mut node, false);
        assert!(node.special_use.is_none());
        assert!(node.flags.is_empty());
    }
}
