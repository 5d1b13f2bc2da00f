//! Route selection over the real routing table.
//!
//! These tests drive `Router::select` with normalized inputs, which is
//! exactly what dispatch does before running a handler. They pin the
//! ordering contract: deep links and menu buttons beat stateful routes,
//! panel buttons are scoped to their panel, and the idle fallback only
//! catches idle users.

use pretty_assertions::assert_eq;

use sharebox::core::state::ConversationState as S;
use sharebox::telegram::guard::GuardInput;
use sharebox::telegram::handlers::build_router;
use sharebox::telegram::keyboards::labels;
use sharebox::telegram::router::Router;

fn input(text: &str) -> GuardInput {
    GuardInput { text: Some(text.to_string()), state: None, is_admin: false, is_private: true }
}

fn selected(router: &Router, input: &GuardInput) -> Option<&'static str> {
    router.select(input, 0).map(|(_, name)| name)
}

#[test]
fn deep_link_wins_even_mid_flow() {
    let router = build_router();
    let mut i = input("/start get_Abc123xyz456789");
    i.state = Some(S::UploadCollect);
    assert_eq!(selected(&router, &i), Some("start_get"));
}

#[test]
fn plain_start_is_not_the_deep_link_route() {
    let router = build_router();
    assert_eq!(selected(&router, &input("/start")), Some("start"));
}

#[test]
fn menu_buttons_beat_stateful_receives() {
    let router = build_router();
    let mut i = input(labels::UPLOAD);
    i.state = Some(S::DeleteFile);
    assert_eq!(selected(&router, &i), Some("upload_start"));
}

#[test]
fn upload_buttons_are_scoped_to_the_session_state() {
    let router = build_router();
    let mut i = input(labels::FINISH_UPLOAD);
    i.state = Some(S::UploadCollect);
    assert_eq!(selected(&router, &i), Some("upload_finish"));

    // Outside the session the same text is just idle chatter.
    let i = input(labels::FINISH_UPLOAD);
    assert_eq!(selected(&router, &i), Some("idle"));
}

#[test]
fn free_text_in_a_flow_hits_its_receive_route() {
    let router = build_router();
    let mut i = input("Abc123xyz456789");
    i.state = Some(S::DeleteFile);
    assert_eq!(selected(&router, &i), Some("delete_receive"));

    i.state = Some(S::GetFileAwaitPassword);
    assert_eq!(selected(&router, &i), Some("get_password_receive"));

    i.state = Some(S::UploadCollect);
    assert_eq!(selected(&router, &i), Some("upload_collect"));
}

#[test]
fn admin_panel_needs_the_admin_flag() {
    let router = build_router();
    let i = input(labels::ADMIN_PANEL);
    assert_eq!(selected(&router, &i), Some("idle"));

    let mut i = input(labels::ADMIN_PANEL);
    i.is_admin = true;
    assert_eq!(selected(&router, &i), Some("admin_panel"));
}

#[test]
fn panel_buttons_are_scoped_to_their_panel() {
    let router = build_router();

    let mut i = input(labels::STATS);
    i.is_admin = true;
    i.state = Some(S::AdminPanel);
    assert_eq!(selected(&router, &i), Some("admin_stats"));

    // Same button outside the panel does nothing admin-ish.
    let mut i = input(labels::STATS);
    i.is_admin = true;
    assert_eq!(selected(&router, &i), Some("idle"));

    let mut i = input(labels::ADD_CHANNEL);
    i.is_admin = true;
    i.state = Some(S::JoinPanel);
    assert_eq!(selected(&router, &i), Some("add_channel_prompt"));
}

#[test]
fn admin_receive_routes_reject_non_admins() {
    let router = build_router();
    let mut i = input("12345");
    i.state = Some(S::AdminSetAdmin);
    // Without the flag the route's Admin guard fails; the user is in a
    // state, so the idle fallback does not apply either.
    assert_eq!(selected(&router, &i), None);

    i.is_admin = true;
    assert_eq!(selected(&router, &i), Some("set_admin_receive"));
}

#[test]
fn group_chats_are_ignored() {
    let router = build_router();
    let mut i = input("/start");
    i.is_private = false;
    assert_eq!(selected(&router, &i), None);
}

#[test]
fn declined_routes_resume_scanning_below() {
    let router = build_router();
    // A back press while awaiting a caption code: the receive route
    // matches first, would decline the menu text, and the scan resumes
    // after it — but "back" sits above the receive routes, so it wins
    // outright.
    let mut i = input(labels::BACK);
    i.state = Some(S::CaptionAwaitCode);
    assert_eq!(selected(&router, &i), Some("back"));

    // For a text that only a declining route matches, the rescan finds
    // nothing afterwards.
    let mut i = input("some text");
    i.state = Some(S::CaptionAwaitCode);
    let (first_idx, name) = router.select(&i, 0).unwrap();
    assert_eq!(name, "caption_code_receive");
    assert_eq!(router.select(&i, first_idx + 1), None);
}

#[test]
fn idle_fallback_catches_unrouted_text() {
    let router = build_router();
    assert_eq!(selected(&router, &input("hello there")), Some("idle"));
}
