//! The single reducer: `(state, action) -> state`.
//!
//! Synchronous and free of I/O. Every branch ends with the stage index
//! rebuilt, so no caller can observe a lead collection and an index that
//! disagree.

use std::collections::HashMap;

use super::stage::sort_for_display;
use super::{conversation::upsert_message, Action, DashboardState, Lead, LeadPatch};
use crate::domain::foundation::LeadId;

pub fn reduce(mut state: DashboardState, action: Action) -> DashboardState {
    match action {
        Action::SetLeads(leads) => {
            state.leads = dedupe_leads(leads);
            retain_selection(&mut state);
        }
        Action::AddLead(lead) => upsert_lead(&mut state, LeadPatch::from(lead)),
        Action::UpdateLead(patch) => upsert_lead(&mut state, patch),
        Action::RemoveLead(id) => {
            state.leads.retain(|l| l.id != id);
            state.conversations.remove(&id);
            if state.selected_lead.as_ref() == Some(&id) {
                state.selected_lead = None;
            }
        }
        Action::SetStages(mut stages) => {
            sort_for_display(&mut stages);
            state.stages = stages;
        }
        Action::SetSelectedLead(selected) => {
            state.selected_lead = selected.filter(|id| state.contains_lead(id));
        }
        Action::SetMetrics(metrics) => state.metrics = metrics,
        Action::SetConnectionStatus(status) => state.connection_status = status,
        Action::SetConversation { lead_id, messages } => {
            let mut thread = Vec::with_capacity(messages.len());
            for message in messages {
                upsert_message(&mut thread, message);
            }
            state.conversations.insert(lead_id, thread);
        }
        Action::AddMessage {
            lead_id,
            mut message,
        } => {
            if message.lead_id.is_none() {
                message.lead_id = Some(lead_id.clone());
            }
            upsert_message(state.conversations.entry(lead_id).or_default(), message);
        }
    }

    state.reindex();
    state
}

fn upsert_lead(state: &mut DashboardState, patch: LeadPatch) {
    match state.leads.iter_mut().find(|l| l.id == patch.id) {
        Some(existing) => existing.merge(&patch),
        None => state.leads.push(Lead::from(patch)),
    }
}

/// Later duplicates merge into the first occurrence's slot.
fn dedupe_leads(leads: Vec<Lead>) -> Vec<Lead> {
    let mut positions: HashMap<LeadId, usize> = HashMap::with_capacity(leads.len());
    let mut out: Vec<Lead> = Vec::with_capacity(leads.len());
    for lead in leads {
        match positions.get(&lead.id) {
            Some(&pos) => out[pos].merge(&LeadPatch::from(lead)),
            None => {
                positions.insert(lead.id.clone(), out.len());
                out.push(lead);
            }
        }
    }
    out
}

fn retain_selection(state: &mut DashboardState) {
    if let Some(selected) = &state.selected_lead {
        if !state.contains_lead(selected) {
            state.selected_lead = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::ConnectionState;
    use crate::domain::foundation::{MessageId, StageId, UserId};
    use crate::domain::pipeline::{
        ConversationMessage, DashboardMetrics, MessageDirection, PipelineStage,
    };
    use proptest::prelude::*;
    use serde_json::json;

    fn lead_id(s: &str) -> LeadId {
        LeadId::new(s).unwrap()
    }

    fn stage(s: &str) -> StageId {
        StageId::new(s).unwrap()
    }

    fn lead(id: &str, stage_id: &str) -> Lead {
        Lead::new(lead_id(id)).in_stage(stage(stage_id))
    }

    fn apply(actions: Vec<Action>) -> DashboardState {
        actions.into_iter().fold(DashboardState::default(), reduce)
    }

    #[test]
    fn set_leads_builds_index() {
        let state = apply(vec![Action::SetLeads(vec![
            lead("1", "a"),
            lead("2", "b"),
            lead("3", "a"),
        ])]);

        assert_eq!(state.lead_ids_in_stage(&stage("a")), &[lead_id("1"), lead_id("3")]);
        assert_eq!(state.lead_ids_in_stage(&stage("b")), &[lead_id("2")]);
        assert!(state.lead_ids_in_stage(&stage("zzz")).is_empty());
        state.check_invariants().unwrap();
    }

    #[test]
    fn set_leads_dedupes_keeping_first_position() {
        let state = apply(vec![Action::SetLeads(vec![
            lead("1", "a").with_score(1.0),
            lead("2", "a"),
            lead("1", "b"),
        ])]);

        assert_eq!(state.leads().len(), 2);
        assert_eq!(state.leads()[0].id, lead_id("1"));
        assert_eq!(state.leads()[0].stage_id, Some(stage("b")));
        assert_eq!(state.leads()[0].score, Some(1.0));
        state.check_invariants().unwrap();
    }

    #[test]
    fn update_lead_merges_instead_of_replacing() {
        let mut original = lead("1", "a").with_score(40.0);
        original.extra.insert("name".into(), json!("Ada"));

        let state = apply(vec![
            Action::AddLead(original),
            Action::UpdateLead(LeadPatch::new(lead_id("1")).with_stage(Some(stage("b")))),
        ]);

        let updated = state.lead(&lead_id("1")).unwrap();
        assert_eq!(updated.stage_id, Some(stage("b")));
        assert_eq!(updated.score, Some(40.0));
        assert_eq!(updated.extra.get("name"), Some(&json!("Ada")));
        assert!(state.lead_ids_in_stage(&stage("a")).is_empty());
        assert_eq!(state.lead_ids_in_stage(&stage("b")), &[lead_id("1")]);
    }

    #[test]
    fn update_unknown_lead_inserts_once() {
        let patch = LeadPatch::new(lead_id("9")).with_stage(Some(stage("a")));
        let state = apply(vec![
            Action::UpdateLead(patch.clone()),
            Action::UpdateLead(patch),
        ]);
        assert_eq!(state.leads().len(), 1);
        state.check_invariants().unwrap();
    }

    #[test]
    fn duplicate_add_equals_single_update() {
        let created = lead("1", "a").with_score(10.0);

        let twice = apply(vec![
            Action::AddLead(created.clone()),
            Action::AddLead(created.clone()),
        ]);
        let once_then_update = apply(vec![
            Action::AddLead(created.clone()),
            Action::UpdateLead(LeadPatch::from(created)),
        ]);

        assert_eq!(twice, once_then_update);
        assert_eq!(twice.leads().len(), 1);
    }

    #[test]
    fn remove_lead_clears_every_trace() {
        let state = apply(vec![
            Action::SetLeads(vec![lead("1", "a"), lead("2", "a")]),
            Action::SetSelectedLead(Some(lead_id("1"))),
            Action::AddMessage {
                lead_id: lead_id("1"),
                message: ConversationMessage::new("hello", MessageDirection::Inbound),
            },
            Action::RemoveLead(lead_id("1")),
        ]);

        assert!(!state.contains_lead(&lead_id("1")));
        assert_eq!(state.lead_ids_in_stage(&stage("a")), &[lead_id("2")]);
        assert!(state.selected_lead_id().is_none());
        assert!(state.conversation(&lead_id("1")).is_empty());
        state.check_invariants().unwrap();
    }

    #[test]
    fn removing_last_lead_of_stage_drops_bucket() {
        let state = apply(vec![
            Action::AddLead(lead("1", "a")),
            Action::RemoveLead(lead_id("1")),
        ]);
        assert!(state.stage_index().is_empty());
    }

    #[test]
    fn clearing_stage_unindexes_lead() {
        let state = apply(vec![
            Action::AddLead(lead("1", "a")),
            Action::UpdateLead(LeadPatch::new(lead_id("1")).with_stage(None)),
        ]);
        assert!(state.lead_ids_in_stage(&stage("a")).is_empty());
        assert!(state.contains_lead(&lead_id("1")));
    }

    #[test]
    fn set_stages_sorts_by_display_order() {
        let state = apply(vec![Action::SetStages(vec![
            PipelineStage::new(stage("won"), "Won", 3),
            PipelineStage::new(stage("new"), "New", 0),
        ])]);
        assert_eq!(state.stages()[0].id, stage("new"));
        assert_eq!(state.stage(&stage("won")).unwrap().name, "Won");
    }

    #[test]
    fn selecting_unknown_lead_clears_selection() {
        let state = apply(vec![
            Action::AddLead(lead("1", "a")),
            Action::SetSelectedLead(Some(lead_id("1"))),
            Action::SetSelectedLead(Some(lead_id("nope"))),
        ]);
        assert!(state.selected_lead().is_none());
    }

    #[test]
    fn set_leads_drops_stale_selection() {
        let state = apply(vec![
            Action::AddLead(lead("1", "a")),
            Action::SetSelectedLead(Some(lead_id("1"))),
            Action::SetLeads(vec![lead("2", "a")]),
        ]);
        assert!(state.selected_lead_id().is_none());
    }

    #[test]
    fn add_message_is_idempotent_by_id() {
        let msg = ConversationMessage::new("hi", MessageDirection::Inbound)
            .with_id(MessageId::new("m1").unwrap());
        let state = apply(vec![
            Action::AddMessage {
                lead_id: lead_id("1"),
                message: msg.clone(),
            },
            Action::AddMessage {
                lead_id: lead_id("1"),
                message: msg,
            },
        ]);
        let thread = state.conversation(&lead_id("1"));
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].lead_id, Some(lead_id("1")));
    }

    #[test]
    fn set_conversation_replaces_thread() {
        let state = apply(vec![
            Action::AddMessage {
                lead_id: lead_id("1"),
                message: ConversationMessage::new("old", MessageDirection::Inbound),
            },
            Action::SetConversation {
                lead_id: lead_id("1"),
                messages: vec![ConversationMessage::new("new", MessageDirection::Outbound)],
            },
        ]);
        assert_eq!(state.conversation(&lead_id("1"))[0].content, "new");
    }

    #[test]
    fn metrics_and_status_are_replaced() {
        let metrics = DashboardMetrics {
            total_leads: Some(3),
            ..Default::default()
        };
        let state = apply(vec![
            Action::SetMetrics(metrics.clone()),
            Action::SetConnectionStatus(ConnectionState::Connected),
        ]);
        assert_eq!(state.metrics(), &metrics);
        assert_eq!(state.connection_status(), ConnectionState::Connected);
    }

    // Small id spaces so generated actions collide often.
    fn arb_lead_id() -> impl Strategy<Value = LeadId> {
        (0u8..6).prop_map(|n| LeadId::new(n.to_string()).unwrap())
    }

    fn arb_stage() -> impl Strategy<Value = Option<StageId>> {
        prop::option::of((0u8..4).prop_map(|n| StageId::new(format!("s{}", n)).unwrap()))
    }

    fn arb_patch() -> impl Strategy<Value = LeadPatch> {
        (
            arb_lead_id(),
            prop::option::of(arb_stage()),
            prop::option::of(prop::option::of(0u8..100)),
            prop::option::of(prop::option::of((0u8..3).prop_map(|n| {
                UserId::new(format!("u{}", n)).unwrap()
            }))),
        )
            .prop_map(|(id, stage_id, score, assigned_to)| LeadPatch {
                id,
                stage_id,
                score: score.map(|s| s.map(f64::from)),
                assigned_to,
                extra: Default::default(),
            })
    }

    fn arb_stages() -> impl Strategy<Value = Vec<PipelineStage>> {
        prop::collection::vec(
            ((0u8..4), (-2i32..4)).prop_map(|(n, order)| {
                PipelineStage::new(stage(&format!("s{}", n)), format!("Stage {}", n), order)
            }),
            0..5,
        )
    }

    fn arb_message() -> impl Strategy<Value = ConversationMessage> {
        (prop::option::of(0u8..4), any::<bool>()).prop_map(|(id, inbound)| {
            let direction = if inbound {
                MessageDirection::Inbound
            } else {
                MessageDirection::Outbound
            };
            let message = ConversationMessage::new("text", direction);
            match id {
                Some(n) => message.with_id(MessageId::new(format!("m{}", n)).unwrap()),
                None => message,
            }
        })
    }

    fn arb_status() -> impl Strategy<Value = ConnectionState> {
        prop_oneof![
            Just(ConnectionState::Disconnected),
            Just(ConnectionState::Connecting),
            Just(ConnectionState::Connected),
            Just(ConnectionState::Reconnecting),
            Just(ConnectionState::Failed),
        ]
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            prop::collection::vec(arb_patch().prop_map(Lead::from), 0..8).prop_map(Action::SetLeads),
            arb_patch().prop_map(|p| Action::AddLead(Lead::from(p))),
            arb_patch().prop_map(Action::UpdateLead),
            arb_lead_id().prop_map(Action::RemoveLead),
            prop::option::of(arb_lead_id()).prop_map(Action::SetSelectedLead),
            arb_stages().prop_map(Action::SetStages),
            prop::option::of(0u64..50).prop_map(|total_leads| Action::SetMetrics(DashboardMetrics {
                total_leads,
                ..Default::default()
            })),
            arb_status().prop_map(Action::SetConnectionStatus),
            (arb_lead_id(), prop::collection::vec(arb_message(), 0..4))
                .prop_map(|(lead_id, messages)| Action::SetConversation { lead_id, messages }),
            (arb_lead_id(), arb_message())
                .prop_map(|(lead_id, message)| Action::AddMessage { lead_id, message }),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_after_every_action(actions in prop::collection::vec(arb_action(), 0..40)) {
            let mut state = DashboardState::default();
            for action in actions {
                state = reduce(state, action);
                if let Err(violation) = state.check_invariants() {
                    prop_assert!(false, "{}", violation);
                }
                prop_assert!(state
                    .stages()
                    .windows(2)
                    .all(|pair| pair[0].display_order <= pair[1].display_order));
            }
        }

        #[test]
        fn update_keeps_fields_the_patch_omits(base in arb_patch(), mut patch in arb_patch()) {
            patch.id = base.id.clone();
            let before = Lead::from(base);
            let state = reduce(
                reduce(DashboardState::default(), Action::AddLead(before.clone())),
                Action::UpdateLead(patch.clone()),
            );
            let after = state.lead(&before.id).unwrap();
            if patch.stage_id.is_none() {
                prop_assert_eq!(&after.stage_id, &before.stage_id);
            }
            if patch.score.is_none() {
                prop_assert_eq!(after.score, before.score);
            }
            if patch.assigned_to.is_none() {
                prop_assert_eq!(&after.assigned_to, &before.assigned_to);
            }
        }
    }
}
