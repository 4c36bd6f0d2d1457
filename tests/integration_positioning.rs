use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use term_overlay::overlay::{AnchorPoint, RelativeTo};
use term_overlay::{
    Align, Area, DialogOptions, ElementId, EngineConfig, FloatRect, LayoutOracle, OverlayEngine,
    OwnerEvent, OwnerId, PartId, PopupAnchor, PopupOptions, SizeConstraints, ViewId,
};

const V: OwnerId = OwnerId::View(ViewId(1));
const P: OwnerId = OwnerId::Part(PartId(1));

fn engine() -> OverlayEngine<LayoutOracle> {
    let mut oracle = LayoutOracle::new(Rect::new(0, 0, 120, 40));
    oracle.insert_view(ViewId(1), Rect::new(0, 0, 80, 40), Area::Main);
    oracle.insert_part(PartId(1), Rect::new(80, 0, 40, 40), Area::Peripheral);
    OverlayEngine::new(oracle, EngineConfig::default())
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
    MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    }
}

fn drag(e: &mut OverlayEngine<LayoutOracle>, from: (u16, u16), to: (u16, u16)) {
    let left = MouseButton::Left;
    e.handle_mouse(&mouse(MouseEventKind::Down(left), from.0, from.1))
        .unwrap();
    e.handle_mouse(&mouse(MouseEventKind::Drag(left), to.0, to.1))
        .unwrap();
    e.handle_mouse(&mouse(MouseEventKind::Up(left), to.0, to.1))
        .unwrap();
}

fn resize_viewport(e: &mut OverlayEngine<LayoutOracle>, width: u16, height: u16) {
    let area = Rect::new(0, 0, width, height);
    e.oracle_mut().set_root(area);
    e.oracle_mut().set_viewport(area);
    e.handle_owner_event(OwnerEvent::Geometry(OwnerId::Root))
        .unwrap();
}

#[test]
fn min_width_wins_over_max_in_both_drag_directions() {
    let mut e = engine();
    let d = e
        .open_dialog(
            DialogOptions::new()
                .context(V)
                .constraints(SizeConstraints::default().width(Some(50), Some(40))),
        )
        .unwrap();
    let start = e.node(d.id).unwrap().bounds().unwrap();
    assert_eq!(start.width, 50);
    let edge = (start.right() as u16 - 1, start.y as u16 + 3);

    drag(&mut e, edge, (edge.0 - 20, edge.1));
    let shrunk = e.node(d.id).unwrap().bounds().unwrap();
    assert_eq!(shrunk.width, 50);

    drag(&mut e, edge, (edge.0 + 40, edge.1));
    assert_eq!(e.node(d.id).unwrap().bounds().unwrap().width, 50);

    e.set_constraints(d.id, SizeConstraints::default().width(Some(60), Some(10)))
        .unwrap();
    assert_eq!(e.node(d.id).unwrap().size().width, 60);
}

#[test]
fn left_edge_drag_keeps_right_edge_fixed() {
    let mut e = engine();
    let d = e
        .open_dialog(
            DialogOptions::new()
                .context(V)
                .size(30, 10)
                .constraints(SizeConstraints::default().width(Some(20), None)),
        )
        .unwrap();
    let start = e.node(d.id).unwrap().bounds().unwrap();
    let edge = (start.x as u16, start.y as u16 + 4);
    drag(&mut e, edge, (edge.0 + 25, edge.1));
    let end = e.node(d.id).unwrap().bounds().unwrap();
    assert_eq!(end.width, 20);
    assert_eq!(end.right(), start.right());
}

#[test]
fn point_popup_relative_to_viewport_stays_pinned() {
    let mut e = engine();
    let popup = e
        .open_popup(
            PopupOptions::new(PopupAnchor::point_relative(
                AnchorPoint::top_left(10, 10),
                RelativeTo::Viewport,
            ))
            .context(V)
            .align(Align::East)
            .size(24, 6),
        )
        .unwrap();
    let pinned = FloatRect::new(10, 7, 24, 6);
    assert_eq!(e.node(popup.id).unwrap().bounds(), Some(pinned));

    resize_viewport(&mut e, 100, 30);
    assert_eq!(e.node(popup.id).unwrap().bounds(), Some(pinned));
    resize_viewport(&mut e, 140, 50);
    assert_eq!(e.node(popup.id).unwrap().bounds(), Some(pinned));
}

#[test]
fn far_away_point_anchor_clamps_to_context_corner() {
    let mut e = engine();
    let popup = e
        .open_popup(
            PopupOptions::new(PopupAnchor::point(AnchorPoint::top_left(10_000, 10_000)))
                .context(V)
                .size(24, 6),
        )
        .unwrap();
    assert_eq!(
        e.node(popup.id).unwrap().bounds(),
        Some(FloatRect::new(56, 34, 24, 6))
    );
}

#[test]
fn element_popup_flips_when_there_is_no_room_below() {
    let mut e = engine();
    e.oracle_mut()
        .set_element(ElementId(5), Rect::new(10, 37, 8, 1));
    let popup = e
        .open_popup(
            PopupOptions::new(PopupAnchor::Element(ElementId(5)))
                .context(V)
                .align(Align::South)
                .size(12, 5),
        )
        .unwrap();
    let node = e.node(popup.id).unwrap();
    assert_eq!(node.popup().unwrap().effective_align, Align::North);
    assert_eq!(node.bounds(), Some(FloatRect::new(8, 32, 12, 5)));

    // The anchor moving is picked up on the next geometry event.
    e.oracle_mut()
        .set_element(ElementId(5), Rect::new(10, 2, 8, 1));
    e.handle_owner_event(OwnerEvent::Geometry(V)).unwrap();
    let node = e.node(popup.id).unwrap();
    assert_eq!(node.popup().unwrap().effective_align, Align::South);
    assert_eq!(node.bounds(), Some(FloatRect::new(8, 3, 12, 5)));
}

#[test]
fn outlet_offset_shifts_element_anchor() {
    let mut e = engine();
    e.oracle_mut()
        .set_element(ElementId(6), Rect::new(4, 4, 2, 1));
    e.oracle_mut().set_outlet_offset(ElementId(6), 20, 3);
    let popup = e
        .open_popup(
            PopupOptions::new(PopupAnchor::Element(ElementId(6)))
                .context(V)
                .size(10, 4),
        )
        .unwrap();
    assert_eq!(
        e.node(popup.id).unwrap().bounds(),
        Some(FloatRect::new(20, 8, 10, 4))
    );
}

#[test]
fn dialog_may_outgrow_its_context() {
    let mut e = engine();
    let d = e
        .open_dialog(DialogOptions::new().context(P).size(60, 12))
        .unwrap();
    let bounds = e.node(d.id).unwrap().bounds().unwrap();
    assert_eq!(bounds.width, 60);
    assert_eq!(bounds.height, 12);
    // Centered on the part, then pulled back inside the viewport.
    assert_eq!(bounds.right(), 120);
}

#[test]
fn peripheral_dialog_centers_on_workbench_while_maximized() {
    let mut e = engine();
    e.oracle_mut().set_main_area_maximized(true);
    let d = e
        .open_dialog(DialogOptions::new().context(P).size(20, 10))
        .unwrap();
    assert_eq!(
        e.node(d.id).unwrap().bounds(),
        Some(FloatRect::new(50, 15, 20, 10))
    );
}

#[test]
fn dragged_dialog_follows_its_view_and_keeps_offset_on_resize() {
    let mut e = engine();
    let d = e
        .open_dialog(DialogOptions::new().context(V).size(20, 6))
        .unwrap();
    let start = e.node(d.id).unwrap().bounds().unwrap();
    let header = (start.x as u16 + 5, start.y as u16 + 1);
    drag(&mut e, header, (header.0 + 6, header.1 + 2));
    let moved = start.translate(6, 2);
    assert_eq!(e.node(d.id).unwrap().bounds(), Some(moved));

    e.oracle_mut().set_bounds(V, Rect::new(4, 0, 80, 40));
    e.handle_owner_event(OwnerEvent::Geometry(V)).unwrap();
    assert_eq!(e.node(d.id).unwrap().bounds(), Some(moved.translate(4, 0)));

    // Content growth re-centers around the same offset.
    e.set_content_size(d.id, 24, 6).unwrap();
    assert_eq!(
        e.node(d.id).unwrap().bounds(),
        Some(FloatRect::new(moved.x + 4 - 2, moved.y, 24, 6))
    );
}

#[test]
fn closing_a_lower_dialog_does_not_drop_a_new_one_onto_the_top() {
    let mut e = engine();
    let d1 = e.open_dialog(DialogOptions::new().context(V).size(20, 6)).unwrap();
    let d2 = e.open_dialog(DialogOptions::new().context(V).size(20, 6)).unwrap();
    e.close(d1.id, None).unwrap();
    let d3 = e.open_dialog(DialogOptions::new().context(V).size(20, 6)).unwrap();

    let b2 = e.node(d2.id).unwrap().bounds().unwrap();
    let b3 = e.node(d3.id).unwrap().bounds().unwrap();
    let (dx, dy) = EngineConfig::default().cascade_offset;
    assert_ne!(b3, b2);
    assert_eq!(b3, b2.translate(dx, dy));
}
