//! Implementation for the authenticated state.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;
use crate::parser::{Namespaces, Response, ResponseParser, StatusItem, UntaggedResponse};
use crate::types::{Mailbox, MailboxNode, MailboxStatus, ResponseCode, check_special_use};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox for read-write access.
    ///
    /// Consumes self and returns a selected client on success.
    pub async fn select(self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        self.select_with(mailbox, false).await
    }

    /// Selects a mailbox for read-write access, optionally enabling CONDSTORE.
    ///
    /// `condstore` is silently ignored by servers that do not advertise the
    /// CONDSTORE capability; callers should check [`Client::supports_condstore`]
    /// first if they need to know whether mod-sequences will actually be
    /// reported.
    pub async fn select_with(
        mut self,
        mailbox: &str,
        condstore: bool,
    ) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let tag = self.tag_gen.next();
        let cmd = Command::Select {
            mailbox: Mailbox::new(mailbox),
            condstore,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let status = Self::parse_mailbox_status(&responses);
        Self::check_tagged_ok(&responses, &tag)?;

        Ok((
            Client {
                stream: self.stream,
                tag_gen: self.tag_gen,
                capabilities: self.capabilities,
                mailbox: Some(mailbox.to_string()),
                _state: PhantomData,
            },
            status,
        ))
    }

    /// Examines a mailbox for read-only access.
    ///
    /// Consumes self and returns a selected client on success.
    pub async fn examine(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let tag = self.tag_gen.next();
        let cmd = Command::Examine {
            mailbox: Mailbox::new(mailbox),
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut status = Self::parse_mailbox_status(&responses);
        status.read_only = true;
        Self::check_tagged_ok(&responses, &tag)?;

        Ok((
            Client {
                stream: self.stream,
                tag_gen: self.tag_gen,
                capabilities: self.capabilities,
                mailbox: Some(mailbox.to_string()),
                _state: PhantomData,
            },
            status,
        ))
    }

    /// Lists mailboxes matching a pattern.
    pub async fn list(
        &mut self,
        reference: &str,
        pattern: &str,
    ) -> Result<Vec<crate::types::ListResponse>> {
        let tag = self.tag_gen.next();
        let cmd = Command::List {
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut list_responses = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::List(item))) =
                ResponseParser::parse(response_bytes)
            {
                list_responses.push(item);
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(list_responses)
    }

    /// Lists mailboxes matching a pattern and assembles them into a
    /// hierarchy.
    ///
    /// Each matching mailbox is folded into a [`MailboxNode`] tree via
    /// [`MailboxNode::ensure_path`], walked/split on the server's reported
    /// hierarchy delimiter. Each node's special-use role is then inferred or
    /// confirmed via [`check_special_use`], gated on whether the server
    /// advertises `SPECIAL-USE` ([`Client::supports_special_use`]).
    pub async fn list_tree(&mut self, reference: &str, pattern: &str) -> Result<MailboxNode> {
        let special_use_capable = self.supports_special_use();
        let list_responses = self.list(reference, pattern).await?;
        Ok(Self::build_tree(list_responses, special_use_capable))
    }

    /// Folds flat LIST responses into a [`MailboxNode`] hierarchy.
    ///
    /// Pulled out of [`Self::list_tree`] so the folding logic can be
    /// exercised without a live connection.
    fn build_tree(
        list_responses: Vec<crate::types::ListResponse>,
        special_use_capable: bool,
    ) -> MailboxNode {
        let mut root = MailboxNode::root();
        for item in list_responses {
            let node = root.ensure_path(item.mailbox.as_str(), item.delimiter);
            node.flags = item.attributes;
            node.listed = true;
            check_special_use(node, special_use_capable);
        }
        root
    }

    /// Gets the status of a mailbox without selecting it.
    pub async fn status(
        &mut self,
        mailbox: &str,
        items: Vec<crate::command::StatusAttribute>,
    ) -> Result<Vec<StatusItem>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Status {
            mailbox: Mailbox::new(mailbox),
            items,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut result = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Status { items, .. })) =
                ResponseParser::parse(response_bytes)
            {
                result.extend(items);
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(result)
    }

    /// Queries the server's personal, other-users', and shared namespaces
    /// (RFC 2342).
    ///
    /// Returns `None` if the server does not advertise the `NAMESPACE`
    /// capability; callers should check [`Client::supports_namespace`] first
    /// if they want to distinguish "unsupported" from "all three classes
    /// absent".
    ///
    /// # Errors
    ///
    /// Returns an error if the command is rejected or the connection fails.
    pub async fn namespace(&mut self) -> Result<Option<Namespaces>> {
        if !self.supports_namespace() {
            return Ok(None);
        }

        let tag = self.tag_gen.next();
        let cmd = Command::Namespace.serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut namespaces = None;

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Namespace(ns))) =
                ResponseParser::parse(response_bytes)
            {
                namespaces = Some(ns);
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(namespaces)
    }

    /// Exchanges client/server identification (RFC 2971).
    ///
    /// Passing `None` sends `ID NIL`. Returns the server's identification
    /// fields, lowercased by key, or `None` if the server sent `ID NIL` or
    /// does not advertise the `ID` capability.
    ///
    /// # Errors
    ///
    /// Returns an error if the command is rejected or the connection fails.
    pub async fn id(
        &mut self,
        parameters: Option<Vec<(String, String)>>,
    ) -> Result<Option<std::collections::HashMap<String, String>>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Id { parameters }.serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut server_id = None;

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Id(id))) =
                ResponseParser::parse(response_bytes)
            {
                server_id = id;
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(server_id)
    }

    /// Gracefully disconnects from the server.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tag_gen.next();
        let cmd = Command::Logout.serialize(&tag);
        self.stream.write_command(&cmd).await?;

        let _ = self.read_until_tagged(&tag).await;
        Ok(())
    }

    /// Parses mailbox status from SELECT/EXAMINE responses.
    ///
    /// The read-only/read-write verdict is carried on the *tagged* completion
    /// (`a1 OK [READ-ONLY] SELECT completed`), not on an untagged line, so the
    /// tagged response's code is folded in alongside the untagged ones.
    pub(super) fn parse_mailbox_status(responses: &[Vec<u8>]) -> MailboxStatus {
        let mut status = MailboxStatus::default();

        for response_bytes in responses {
            match ResponseParser::parse(response_bytes) {
                Ok(Response::Untagged(untagged)) => match untagged {
                    UntaggedResponse::Exists(n) => status.exists = n,
                    UntaggedResponse::Recent(n) => status.recent = n,
                    UntaggedResponse::Flags(flags) => status.flags = flags,
                    UntaggedResponse::Ok {
                        code: Some(code), ..
                    } => Self::apply_response_code(&mut status, &code),
                    _ => {}
                },
                Ok(Response::Tagged {
                    code: Some(code), ..
                }) => Self::apply_response_code(&mut status, &code),
                _ => {}
            }
        }

        status
    }

    /// Folds a single `SELECT`/`EXAMINE`-relevant response code into `status`.
    fn apply_response_code(status: &mut MailboxStatus, code: &ResponseCode) {
        match code {
            ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
            ResponseCode::UidNext(v) => status.uid_next = Some(*v),
            ResponseCode::Unseen(v) => status.unseen = Some(*v),
            ResponseCode::PermanentFlags(flags) => {
                status.permanent_flags = crate::types::Flags::from_vec(flags.clone());
            }
            ResponseCode::ReadOnly => status.read_only = true,
            ResponseCode::ReadWrite => status.read_only = false,
            ResponseCode::HighestModSeq(v) => status.highest_mod_seq = Some(*v),
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::Client;
    use crate::types::{Flag, ListResponse, Mailbox, MailboxAttribute};

    #[test]
    fn select_read_write_folds_tagged_and_untagged_codes() {
        let responses: Vec<Vec<u8>> = vec![
            b"* 123 EXISTS\r\n".to_vec(),
            b"* 1 RECENT\r\n".to_vec(),
            b"* FLAGS (\\Answered \\Flagged)\r\n".to_vec(),
            b"* OK [PERMANENTFLAGS (\\Answered \\Flagged)] permanent flags\r\n".to_vec(),
            b"* OK [UIDVALIDITY 2] UIDs valid\r\n".to_vec(),
            b"* OK [UIDNEXT 38361] predicted next UID\r\n".to_vec(),
            b"* OK [HIGHESTMODSEQ 3682918] highest\r\n".to_vec(),
            b"A002 OK [READ-WRITE] SELECT completed\r\n".to_vec(),
        ];

        let status = Client::<tokio::io::DuplexStream, super::Authenticated>::parse_mailbox_status(
            &responses,
        );

        assert_eq!(status.exists, 123);
        assert!(status.flags.contains(&Flag::Answered));
        assert!(status.flags.contains(&Flag::Flagged));
        assert!(status.permanent_flags.contains(&Flag::Answered));
        assert!(status.permanent_flags.contains(&Flag::Flagged));
        assert!(!status.read_only);
        assert_eq!(status.uid_validity.unwrap().get(), 2);
        assert_eq!(status.uid_next.unwrap().get(), 38361);
        assert_eq!(status.highest_mod_seq, Some(3_682_918));
    }

    #[test]
    fn examine_tagged_read_only_code_marks_status() {
        let responses: Vec<Vec<u8>> = vec![
            b"* 5 EXISTS\r\n".to_vec(),
            b"A003 OK [READ-ONLY] EXAMINE completed\r\n".to_vec(),
        ];

        let status = Client::<tokio::io::DuplexStream, super::Authenticated>::parse_mailbox_status(
            &responses,
        );

        assert!(status.read_only);
    }

    #[test]
    fn build_tree_nests_by_delimiter_and_carries_flags() {
        let responses = vec![
            ListResponse {
                attributes: vec![MailboxAttribute::HasNoChildren],
                delimiter: Some('/'),
                mailbox: Mailbox::new("INBOX"),
            },
            ListResponse {
                attributes: vec![MailboxAttribute::HasChildren],
                delimiter: Some('/'),
                mailbox: Mailbox::new("Work/Invoices"),
            },
        ];

        let tree = Client::<tokio::io::DuplexStream, super::Authenticated>::build_tree(
            responses, false,
        );

        assert_eq!(tree.children.len(), 2);
        let inbox = tree.children.iter().find(|n| n.name == "INBOX").unwrap();
        assert!(inbox.listed);
        assert!(inbox.flags.contains(&MailboxAttribute::HasNoChildren));

        let work = tree.children.iter().find(|n| n.name == "Work").unwrap();
        assert_eq!(work.children.len(), 1);
        assert_eq!(work.children[0].name, "Invoices");
        assert_eq!(work.children[0].path, "Work/Invoices");
    }

    #[test]
    fn build_tree_infers_special_use_when_server_not_capable() {
        let responses = vec![ListResponse {
            attributes: vec![MailboxAttribute::HasNoChildren],
            delimiter: Some('/'),
            mailbox: Mailbox::new("Trash"),
        }];

        let tree = Client::<tokio::io::DuplexStream, super::Authenticated>::build_tree(
            responses, false,
        );

        let trash = &tree.children[0];
        assert_eq!(trash.special_use, Some(MailboxAttribute::Trash));
    }
}
