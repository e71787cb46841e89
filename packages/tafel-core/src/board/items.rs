/// Card-owned collections: subtasks, checklists, comments, attachments.
/// Every change touches the owning card's `updated_at`.
use crate::types::*;

use super::patch::SubtaskPatch;

impl BoardData {
    /// Run `f` against a card and bump its `updated_at` when `f` reports a
    /// change.
    fn with_card<R>(&mut self, card_id: &str, f: impl FnOnce(&mut Card) -> Option<R>) -> Option<R> {
        let card = self.cards.get_mut(card_id)?;
        let result = f(&mut *card)?;
        card.updated_at = timestamp();
        Some(result)
    }

    // ── Subtasks ────────────────────────────────────────────────────────

    pub fn add_subtask(&mut self, card_id: &str, title: &str) -> Option<String> {
        self.with_card(card_id, |card| {
            let subtask = Subtask::new(title);
            let id = subtask.id.clone();
            card.subtasks.push(subtask);
            Some(id)
        })
    }

    pub fn update_subtask(&mut self, card_id: &str, subtask_id: &str, patch: &SubtaskPatch) -> bool {
        self.with_card(card_id, |card| {
            let subtask = card.subtasks.iter_mut().find(|s| s.id == subtask_id)?;
            if let Some(title) = &patch.title {
                subtask.title = title.clone();
            }
            if let Some(completed) = patch.completed {
                subtask.completed = completed;
            }
            Some(())
        })
        .is_some()
    }

    pub fn toggle_subtask(&mut self, card_id: &str, subtask_id: &str) -> bool {
        self.with_card(card_id, |card| {
            let subtask = card.subtasks.iter_mut().find(|s| s.id == subtask_id)?;
            subtask.completed = !subtask.completed;
            Some(())
        })
        .is_some()
    }

    pub fn delete_subtask(&mut self, card_id: &str, subtask_id: &str) -> bool {
        self.with_card(card_id, |card| {
            let position = card.subtasks.iter().position(|s| s.id == subtask_id)?;
            card.subtasks.remove(position);
            Some(())
        })
        .is_some()
    }

    // ── Checklists ──────────────────────────────────────────────────────

    pub fn add_checklist(&mut self, card_id: &str, title: &str) -> Option<String> {
        self.with_card(card_id, |card| {
            let checklist = Checklist {
                id: new_id(),
                title: title.to_string(),
                items: Vec::new(),
                created_at: timestamp(),
            };
            let id = checklist.id.clone();
            card.checklists.push(checklist);
            Some(id)
        })
    }

    pub fn rename_checklist(&mut self, card_id: &str, checklist_id: &str, title: &str) -> bool {
        self.with_card(card_id, |card| {
            let checklist = card.checklists.iter_mut().find(|c| c.id == checklist_id)?;
            checklist.title = title.to_string();
            Some(())
        })
        .is_some()
    }

    pub fn delete_checklist(&mut self, card_id: &str, checklist_id: &str) -> bool {
        self.with_card(card_id, |card| {
            let position = card.checklists.iter().position(|c| c.id == checklist_id)?;
            card.checklists.remove(position);
            Some(())
        })
        .is_some()
    }

    pub fn add_checklist_item(&mut self, card_id: &str, checklist_id: &str, title: &str) -> Option<String> {
        self.with_card(card_id, |card| {
            let checklist = card.checklists.iter_mut().find(|c| c.id == checklist_id)?;
            let item = ChecklistItem::new(title);
            let id = item.id.clone();
            checklist.items.push(item);
            Some(id)
        })
    }

    pub fn toggle_checklist_item(&mut self, card_id: &str, checklist_id: &str, item_id: &str) -> bool {
        self.with_card(card_id, |card| {
            let checklist = card.checklists.iter_mut().find(|c| c.id == checklist_id)?;
            let item = checklist.items.iter_mut().find(|i| i.id == item_id)?;
            item.completed = !item.completed;
            Some(())
        })
        .is_some()
    }

    pub fn delete_checklist_item(&mut self, card_id: &str, checklist_id: &str, item_id: &str) -> bool {
        self.with_card(card_id, |card| {
            let checklist = card.checklists.iter_mut().find(|c| c.id == checklist_id)?;
            let position = checklist.items.iter().position(|i| i.id == item_id)?;
            checklist.items.remove(position);
            Some(())
        })
        .is_some()
    }

    // ── Comments ────────────────────────────────────────────────────────

    pub fn add_comment(&mut self, card_id: &str, text: &str) -> Option<String> {
        self.with_card(card_id, |card| {
            let now = timestamp();
            let comment = Comment {
                id: new_id(),
                text: text.to_string(),
                created_at: now.clone(),
                updated_at: now,
            };
            let id = comment.id.clone();
            card.comments.push(comment);
            Some(id)
        })
    }

    pub fn update_comment(&mut self, card_id: &str, comment_id: &str, text: &str) -> bool {
        self.with_card(card_id, |card| {
            let comment = card.comments.iter_mut().find(|c| c.id == comment_id)?;
            comment.text = text.to_string();
            comment.updated_at = timestamp();
            Some(())
        })
        .is_some()
    }

    pub fn delete_comment(&mut self, card_id: &str, comment_id: &str) -> bool {
        self.with_card(card_id, |card| {
            let position = card.comments.iter().position(|c| c.id == comment_id)?;
            card.comments.remove(position);
            Some(())
        })
        .is_some()
    }

    // ── Attachments ─────────────────────────────────────────────────────

    /// Record an attachment whose file already lives in the managed
    /// attachments directory.
    pub fn add_attachment(
        &mut self,
        card_id: &str,
        name: &str,
        path: &str,
        kind: AttachmentType,
        size: u64,
    ) -> Option<String> {
        self.with_card(card_id, |card| {
            let attachment = Attachment {
                id: new_id(),
                name: name.to_string(),
                path: path.to_string(),
                kind,
                size,
                created_at: timestamp(),
            };
            let id = attachment.id.clone();
            card.attachments.push(attachment);
            Some(id)
        })
    }

    /// Remove an attachment record and return it; the caller schedules
    /// removal of the backing file. Clears the cover image if it pointed here.
    pub fn remove_attachment(&mut self, card_id: &str, attachment_id: &str) -> Option<Attachment> {
        self.with_card(card_id, |card| {
            let position = card.attachments.iter().position(|a| a.id == attachment_id)?;
            if card.cover_image_id.as_deref() == Some(attachment_id) {
                card.cover_image_id = None;
            }
            Some(card.attachments.remove(position))
        })
    }

    /// Point the card cover at one of its image attachments, or clear it.
    pub fn set_cover_image(&mut self, card_id: &str, attachment_id: Option<&str>) -> bool {
        self.with_card(card_id, |card| {
            if let Some(id) = attachment_id {
                card.attachments
                    .iter()
                    .find(|a| a.id == id && a.kind == AttachmentType::Image)?;
            }
            card.cover_image_id = attachment_id.map(str::to_string);
            Some(())
        })
        .is_some()
    }
}
