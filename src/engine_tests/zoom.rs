use crate::config::EngineConfig;
use crate::geometry::Point;
use crate::model::Annotation;
use crate::test_support::{image_item, loaded_image, Harness};
use crate::view::View;

fn unfitted_view(h: &mut Harness) -> View {
    let mut config = EngineConfig::default();
    config.preferences.reset_zoom_on_item_change = false;
    let view = View::new(0, &h.services, &config);
    let load = view.set_item(image_item(1), None);
    h.resolver.respond(1, loaded_image(1, 120, 230));
    h.pool.run_until(load).unwrap();
    view
}

fn square(id: &str, from: f32, to: f32) -> Annotation {
    Annotation::new(id, "polygon").with_vertices(vec![
        Point::new(from, from),
        Point::new(to, from),
        Point::new(to, to),
        Point::new(from, to),
    ])
}

#[test]
fn test_zoom_box_pads_by_image_size() {
    let mut h = Harness::new();
    let view = unfitted_view(&mut h);
    assert_eq!(view.camera().scale, 1.0);

    let (top_left, bottom_right) = view.zoom_box_for(&square("a", 0.0, 10.0)).unwrap();
    assert!((top_left.x + 12.0).abs() < 1e-4);
    assert!((top_left.y + 23.0).abs() < 1e-4);
    assert!((bottom_right.x - 22.0).abs() < 1e-4);
    assert!((bottom_right.y - 33.0).abs() < 1e-4);
}

#[test]
fn test_zoom_to_annotation_moves_camera() {
    let mut h = Harness::new();
    let view = unfitted_view(&mut h);
    view.set_viewport(crate::geometry::Size::new(400.0, 400.0));

    assert!(!view.zoom_to_annotation(&Annotation::new("empty", "polygon")));
    assert_eq!(view.camera().scale, 1.0);

    assert!(view.zoom_to_annotation(&square("a", 50.0, 60.0)));
    assert!(view.camera().scale > 1.0);
}
