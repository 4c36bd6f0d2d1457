use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;
use term_overlay::overlay::AnchorPoint;
use term_overlay::{
    Area, DialogOptions, ElementId, EngineConfig, FocusTarget, LayoutOracle, Modality,
    OverlayEngine, OwnerId, PopupAnchor, PopupOptions, ViewId,
};

const V: OwnerId = OwnerId::View(ViewId(1));
const W: OwnerId = OwnerId::View(ViewId(2));

fn engine() -> OverlayEngine<LayoutOracle> {
    let mut oracle = LayoutOracle::new(Rect::new(0, 0, 120, 40));
    oracle.insert_view(ViewId(1), Rect::new(0, 0, 60, 40), Area::Main);
    oracle.insert_view(ViewId(2), Rect::new(60, 0, 60, 40), Area::Main);
    OverlayEngine::new(oracle, EngineConfig::default())
}

fn opener() -> FocusTarget {
    FocusTarget::Element {
        owner: V,
        element: ElementId(7),
    }
}

#[test]
fn focus_unwinds_through_three_stacked_dialogs() {
    let mut e = engine();
    e.request_focus(opener()).unwrap();
    let d1 = e.open_dialog(DialogOptions::new().context(V)).unwrap();
    let d2 = e.open_dialog(DialogOptions::new().context(V)).unwrap();
    let d3 = e.open_dialog(DialogOptions::new().context(V)).unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(d3.id)));

    e.close(d3.id, None).unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(d2.id)));
    e.close(d2.id, None).unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(d1.id)));
    e.close(d1.id, None).unwrap();
    assert_eq!(e.focused(), Some(opener()));
}

#[test]
fn focus_aimed_at_blocked_view_lands_in_its_dialog() {
    let mut e = engine();
    let d = e.open_dialog(DialogOptions::new().context(V)).unwrap();
    e.set_focusables(d.id, vec![ElementId(1), ElementId(2)])
        .unwrap();
    e.request_focus(FocusTarget::Owner(W)).unwrap();
    assert_eq!(e.focus_owner(), Some(W));

    let landed = e.request_focus(opener()).unwrap();
    assert_eq!(
        landed,
        Some(FocusTarget::Element {
            owner: OwnerId::Overlay(d.id),
            element: ElementId(1),
        })
    );
}

#[test]
fn application_modal_traps_focus_everywhere() {
    let mut e = engine();
    let a = e
        .open_dialog(DialogOptions::new().modality(Modality::ApplicationBlocking))
        .unwrap();
    e.request_focus(FocusTarget::Owner(W)).unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(a.id)));
    e.request_focus(FocusTarget::Owner(OwnerId::Root)).unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(a.id)));
}

#[test]
fn popup_closes_when_focus_moves_elsewhere() {
    let mut e = engine();
    let d = e.open_dialog(DialogOptions::new().context(V)).unwrap();
    let anchor = PopupAnchor::point(AnchorPoint::top_left(2, 2));
    let popup = e
        .open_popup(PopupOptions::new(anchor).context(d.id))
        .unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(popup.id)));

    // A dialog opened from the popup keeps the popup alive.
    let child = e
        .open_dialog(DialogOptions::new().context(popup.id).size(16, 4))
        .unwrap();
    assert!(e.node(popup.id).is_some());
    e.close(child.id, None).unwrap();
    assert_eq!(e.focus_owner(), Some(OwnerId::Overlay(popup.id)));

    e.request_focus(FocusTarget::Owner(W)).unwrap();
    assert!(e.node(popup.id).is_none());
    assert!(e.node(d.id).is_some());
}

#[test]
fn escape_respects_popup_close_strategy() {
    let mut e = engine();
    let anchor = PopupAnchor::point(AnchorPoint::top_left(2, 2));
    let sticky = e
        .open_popup(
            PopupOptions::new(anchor)
                .context(V)
                .close_strategy(false, false),
        )
        .unwrap();
    let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
    assert!(!e.handle_key(&esc).unwrap());
    assert!(e.node(sticky.id).is_some());
}

#[test]
fn back_tab_cycles_backwards() {
    let mut e = engine();
    let d = e.open_dialog(DialogOptions::new().context(V)).unwrap();
    e.set_focusables(d.id, vec![ElementId(1), ElementId(2), ElementId(3)])
        .unwrap();
    let back = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
    assert!(e.handle_key(&back).unwrap());
    assert_eq!(e.focused().and_then(|t| t.element()), Some(ElementId(3)));
    assert!(e.handle_key(&back).unwrap());
    assert_eq!(e.focused().and_then(|t| t.element()), Some(ElementId(2)));
}
