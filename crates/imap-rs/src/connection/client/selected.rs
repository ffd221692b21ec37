//! Implementation for the selected state.

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::{Command, FetchItems, SearchCriteria, StoreAction};
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, Mailbox, MailboxStatus, SequenceSet};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the path of the currently selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.mailbox.as_deref().unwrap_or("")
    }

    /// Closes the current mailbox and returns to authenticated state.
    pub async fn close(mut self) -> Result<Client<S, Authenticated>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Close.serialize(&tag);
        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;

        Ok(Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            mailbox: None,
            _state: PhantomData,
        })
    }

    /// Selects a different mailbox, replacing the one currently open.
    ///
    /// Per RFC 3501 §6.3.1, selecting while already in the selected state
    /// implicitly closes the previous mailbox (without expunging it) before
    /// opening the new one.
    pub async fn select(mut self, mailbox: &str) -> Result<(Self, MailboxStatus)> {
        let tag = self.tag_gen.next();
        let cmd = Command::Select {
            mailbox: Mailbox::new(mailbox),
            condstore: false,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let status = Client::<S, Authenticated>::parse_mailbox_status(&responses);
        Self::check_tagged_ok(&responses, &tag)?;

        self.mailbox = Some(mailbox.to_string());
        Ok((self, status))
    }

    /// Searches for messages matching the given criteria.
    ///
    /// Returns a sorted, deduplicated list of matching sequence numbers,
    /// regardless of how the server split or ordered them across untagged
    /// `SEARCH` records.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<crate::types::SeqNum>> {
        self.search_with(criteria, false).await
    }

    /// Searches for messages matching the given criteria, returning UIDs.
    ///
    /// Returns a sorted, deduplicated list of matching UIDs, regardless of
    /// how the server split or ordered them across untagged `SEARCH` records.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<crate::types::SeqNum>> {
        self.search_with(criteria, true).await
    }

    async fn search_with(
        &mut self,
        criteria: &SearchCriteria,
        uid: bool,
    ) -> Result<Vec<crate::types::SeqNum>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Search {
            criteria: criteria.clone(),
            uid,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut results = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Search(ids))) =
                ResponseParser::parse(response_bytes)
            {
                results.extend(ids);
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;

        // SEARCH results are a sorted, deduplicated set regardless of how the
        // server split them across untagged records.
        results.sort_unstable();
        results.dedup();

        Ok(results)
    }

    /// Fetches message data for the given sequence set.
    ///
    /// Returns a vector of (sequence number, fetch items) pairs.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
    ) -> Result<Vec<(crate::types::SeqNum, Vec<FetchItem>)>> {
        self.fetch_with(sequence, items, None).await
    }

    /// Fetches message data for the given sequence set, restricted to
    /// messages modified since `changed_since` (CONDSTORE `CHANGEDSINCE`).
    ///
    /// `changed_since` is silently ignored by servers that do not advertise
    /// the CONDSTORE capability; callers should check
    /// [`Client::supports_condstore`] first if they need to know whether the
    /// modifier will actually be honored.
    pub async fn fetch_with(
        &mut self,
        sequence: &SequenceSet,
        items: FetchItems,
        changed_since: Option<u64>,
    ) -> Result<Vec<(crate::types::SeqNum, Vec<FetchItem>)>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Fetch {
            sequence: sequence.clone(),
            items,
            uid: false,
            changed_since: changed_since.filter(|_| self.supports_condstore()),
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut results = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) =
                ResponseParser::parse(response_bytes)
            {
                results.push((seq, items));
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(results)
    }

    /// Fetches message data using UIDs.
    ///
    /// Returns a vector of (sequence number, fetch items) pairs.
    pub async fn uid_fetch(
        &mut self,
        uid_set: &crate::types::UidSet,
        items: FetchItems,
    ) -> Result<Vec<(crate::types::SeqNum, Vec<FetchItem>)>> {
        self.uid_fetch_with(uid_set, items, None).await
    }

    /// Fetches message data using UIDs, restricted to messages modified
    /// since `changed_since` (CONDSTORE `CHANGEDSINCE`).
    ///
    /// `changed_since` is silently ignored by servers that do not advertise
    /// the CONDSTORE capability; callers should check
    /// [`Client::supports_condstore`] first if they need to know whether the
    /// modifier will actually be honored.
    pub async fn uid_fetch_with(
        &mut self,
        uid_set: &crate::types::UidSet,
        items: FetchItems,
        changed_since: Option<u64>,
    ) -> Result<Vec<(crate::types::SeqNum, Vec<FetchItem>)>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Fetch {
            sequence: uid_set.as_sequence_set(),
            items,
            uid: true,
            changed_since: changed_since.filter(|_| self.supports_condstore()),
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut results = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) =
                ResponseParser::parse(response_bytes)
            {
                results.push((seq, items));
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(results)
    }

    /// Modifies message flags.
    ///
    /// Returns the updated flags for each affected message.
    pub async fn store(
        &mut self,
        sequence: &SequenceSet,
        action: StoreAction,
    ) -> Result<Vec<(crate::types::SeqNum, Vec<FetchItem>)>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Store {
            sequence: sequence.clone(),
            action,
            uid: false,
            silent: false,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut results = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) =
                ResponseParser::parse(response_bytes)
            {
                results.push((seq, items));
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(results)
    }

    /// Modifies message flags silently (no FETCH response).
    pub async fn store_silent(
        &mut self,
        sequence: &SequenceSet,
        action: StoreAction,
    ) -> Result<()> {
        let tag = self.tag_gen.next();
        let cmd = Command::Store {
            sequence: sequence.clone(),
            action,
            uid: false,
            silent: true,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        Ok(())
    }

    /// Modifies message flags using UIDs.
    pub async fn uid_store(
        &mut self,
        uid_set: &crate::types::UidSet,
        action: StoreAction,
    ) -> Result<Vec<(crate::types::SeqNum, Vec<FetchItem>)>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Store {
            sequence: uid_set.as_sequence_set(),
            action,
            uid: true,
            silent: false,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut results = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) =
                ResponseParser::parse(response_bytes)
            {
                results.push((seq, items));
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(results)
    }

    /// Copies messages to another mailbox.
    pub async fn copy(&mut self, sequence: &SequenceSet, mailbox: &str) -> Result<()> {
        let tag = self.tag_gen.next();
        let cmd = Command::Copy {
            sequence: sequence.clone(),
            mailbox: Mailbox::new(mailbox),
            uid: false,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        Ok(())
    }

    /// Copies messages to another mailbox using UIDs.
    pub async fn uid_copy(&mut self, uid_set: &crate::types::UidSet, mailbox: &str) -> Result<()> {
        let tag = self.tag_gen.next();
        let cmd = Command::Copy {
            sequence: uid_set.as_sequence_set(),
            mailbox: Mailbox::new(mailbox),
            uid: true,
        }
        .serialize(&tag);

        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        Ok(())
    }

    /// Moves messages to another mailbox.
    ///
    /// Uses the MOVE command (RFC 6851) when the server advertises it.
    /// Otherwise falls back to COPY, STORE +FLAGS \Deleted, then EXPUNGE,
    /// returning the sequence numbers the EXPUNGE reported.
    pub async fn r#move(
        &mut self,
        sequence: &SequenceSet,
        mailbox: &str,
    ) -> Result<Vec<crate::types::SeqNum>> {
        if self.has_capability(&Capability::Move) {
            let tag = self.tag_gen.next();
            let cmd = Command::Move {
                sequence: sequence.clone(),
                mailbox: Mailbox::new(mailbox),
                uid: false,
            }
            .serialize(&tag);

            self.stream.write_command(&cmd).await?;

            let responses = self.read_until_tagged(&tag).await?;
            Self::check_tagged_ok(&responses, &tag)?;
            return Ok(Vec::new());
        }

        self.copy(sequence, mailbox).await?;
        self.store_silent(sequence, StoreAction::AddFlags(vec![crate::types::Flag::Deleted]))
            .await?;
        self.expunge().await
    }

    /// Moves messages to another mailbox using UIDs.
    ///
    /// Uses the MOVE command (RFC 6851) when the server advertises it.
    /// Otherwise falls back to UID COPY, UID STORE +FLAGS \Deleted, then
    /// EXPUNGE, returning the sequence numbers the EXPUNGE reported.
    pub async fn uid_move(
        &mut self,
        uid_set: &crate::types::UidSet,
        mailbox: &str,
    ) -> Result<Vec<crate::types::SeqNum>> {
        if self.has_capability(&Capability::Move) {
            let tag = self.tag_gen.next();
            let cmd = Command::Move {
                sequence: uid_set.as_sequence_set(),
                mailbox: Mailbox::new(mailbox),
                uid: true,
            }
            .serialize(&tag);

            self.stream.write_command(&cmd).await?;

            let responses = self.read_until_tagged(&tag).await?;
            Self::check_tagged_ok(&responses, &tag)?;
            return Ok(Vec::new());
        }

        self.uid_copy(uid_set, mailbox).await?;
        let tag = self.tag_gen.next();
        let cmd = Command::Store {
            sequence: uid_set.as_sequence_set(),
            action: StoreAction::AddFlags(vec![crate::types::Flag::Deleted]),
            uid: true,
            silent: true,
        }
        .serialize(&tag);
        self.stream.write_command(&cmd).await?;
        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        self.expunge().await
    }

    /// Permanently removes messages marked as \Deleted.
    ///
    /// Returns the sequence numbers of expunged messages in the order the
    /// server reported them. Unlike [`Self::search`], this is deliberately
    /// not sorted or deduplicated: expunge order can be meaningful (it
    /// reflects the renumbering applied to remaining messages as each
    /// EXPUNGE is processed).
    pub async fn expunge(&mut self) -> Result<Vec<crate::types::SeqNum>> {
        let tag = self.tag_gen.next();
        let cmd = Command::Expunge.serialize(&tag);
        self.stream.write_command(&cmd).await?;

        let responses = self.read_until_tagged(&tag).await?;
        let mut expunged = Vec::new();

        for response_bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Expunge(seq))) =
                ResponseParser::parse(response_bytes)
            {
                expunged.push(seq);
            }
        }

        Self::check_tagged_ok(&responses, &tag)?;
        Ok(expunged)
    }

    /// Gracefully disconnects from the server.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.tag_gen.next();
        let cmd = Command::Logout.serialize(&tag);
        self.stream.write_command(&cmd).await?;

        let _ = self.read_until_tagged(&tag).await;
        Ok(())
    }
}
