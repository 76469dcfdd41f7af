use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use scene_inspector_rs::column::{InspectorColumn, Side};
use scene_inspector_rs::config::InspectorConfig;
use scene_inspector_rs::context::{Canceller, Context};
use scene_inspector_rs::inspector::EditTarget;
use scene_inspector_rs::path::{Contexts, InspectionPath};
use scene_inspector_rs::registry::Registry;
use scene_inspector_rs::scene::{MemoryScene, Scene, SceneHandle};
use scene_inspector_rs::AsNames;

fn setup() -> Result<(Arc<MemoryScene>, InspectionPath)> {
    let scene = Arc::new(MemoryScene::from_json(json!({
        "globals": { "option:render:camera": "/cam" },
        "root": { "children": { "sphere": { "attributes": { "user:a": 1 } } } }
    }))?);
    let path = InspectionPath::with_registry(
        Registry::with_builtin(&InspectorConfig::default()),
        scene.clone() as SceneHandle,
        Contexts::single(Context::new().with_scene_path(&"/sphere".as_names())),
        EditTarget::none(),
        "/",
    );
    Ok((scene, path))
}

fn counter(path: &InspectionPath) -> (Arc<AtomicUsize>, scene_inspector_rs::Connection) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    let connection = path.changed_signal().connect(move || {
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    (count, connection)
}

#[test]
fn scene_edits_raise_path_changed() -> Result<()> {
    let (scene, root) = setup()?;
    let attributes = root.descendant("Selection/Attributes");
    let (root_count, _root_connection) = counter(&root);
    let (attributes_count, _attributes_connection) = counter(&attributes);

    scene.set_attribute(&"/sphere".as_names(), "user:b", json!(2))?;
    scene.set_global("option:user:shot", json!("sh010"));
    assert_eq!(root_count.load(Ordering::SeqCst), 2);
    assert_eq!(attributes_count.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn dropping_a_path_disconnects_it() -> Result<()> {
    let (scene, root) = setup()?;
    let baseline = scene.changed_signal().num_slots();

    let child = root.child("Selection");
    let copy = child.clone();
    assert_eq!(scene.changed_signal().num_slots(), baseline + 2);

    let (count, _connection) = counter(&copy);
    drop(child);
    assert_eq!(scene.changed_signal().num_slots(), baseline + 1);
    scene.set_global("option:user:x", json!(true));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    drop(copy);
    drop(root);
    assert_eq!(scene.changed_signal().num_slots(), baseline - 1);
    Ok(())
}

#[test]
fn queries_after_an_edit_see_the_new_state() -> Result<()> {
    let (scene, root) = setup()?;
    let canceller = Canceller::new();
    let user = root.descendant("Selection/Attributes/User");
    let names = |path: &InspectionPath| -> Result<Vec<String>> {
        Ok(path
            .children(&Canceller::new())?
            .iter()
            .filter_map(|child| child.name().map(|name| name.to_string()))
            .collect())
    };
    assert_eq!(names(&user)?, vec!["user:a"]);

    scene.set_attribute(&"/sphere".as_names(), "user:b", json!(2))?;
    assert_eq!(names(&user)?, vec!["user:a", "user:b"]);

    let column = InspectorColumn::new(Side::A);
    let value = column.inspect(&user.child("user:a"), &canceller)?;
    assert_eq!(value.map(|inspection| inspection.value), Some(json!(1)));
    scene.set_attribute(&"/sphere".as_names(), "user:a", json!(5))?;
    let value = column.inspect(&user.child("user:a"), &canceller)?;
    assert_eq!(value.map(|inspection| inspection.value), Some(json!(5)));

    scene.remove_location(&"/sphere".as_names())?;
    assert!(root.child("Selection").children(&canceller)?.is_empty());
    assert_eq!(names(&root)?, vec!["Globals"]);
    Ok(())
}
