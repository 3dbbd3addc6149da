//! Settings snapshot integration tests.

use std::{fs, path::Path, thread, time::Duration};

use motionbase::{
    MotionSnapshot, SettingsCheck, any_motion_model_exists, check_settings,
    check_settings_changed, find_saved_settings, save_settings_with_model, settings_differ,
};

const BASE: &str = "[DEFAULT]\nstrategy = exponential\nexpA = 0.5\nexpB = 0.8\nrgb_multipliers = 4,4,4\nframe_skip = 1\n";

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, text).expect("Failed to write file");
}

fn train_model(dir: &Path) {
    write(&dir.join("train/weights/best.pt"), "weights");
}

#[test]
fn identical_settings_do_not_differ() {
    let a = MotionSnapshot::from_ini_str(BASE).unwrap();
    let b = MotionSnapshot::from_ini_str(&BASE.replace("4,4,4", "4.0, 4.0, 4.0")).unwrap();
    assert!(!settings_differ(&a, &b));
}

#[test]
fn irrelevant_keys_are_ignored() {
    let a = MotionSnapshot::from_ini_str(BASE).unwrap();
    let b = MotionSnapshot::from_ini_str(&format!("{BASE}scale_factor = 0.25\n")).unwrap();
    assert!(!settings_differ(&a, &b));
}

#[test]
fn strategy_compares_case_insensitively() {
    let a = MotionSnapshot::from_ini_str(BASE).unwrap();
    let b = MotionSnapshot::from_ini_str(&BASE.replace("exponential", " Exponential ")).unwrap();
    assert!(!settings_differ(&a, &b));
}

#[test]
fn relevant_changes_differ() {
    let a = MotionSnapshot::from_ini_str(BASE).unwrap();
    for changed in [
        BASE.replace("expA = 0.5", "expA = 0.6"),
        BASE.replace("frame_skip = 1", "frame_skip = 2"),
        BASE.replace("exponential", "sequential"),
        BASE.replace("4,4,4", "4,4,5"),
        BASE.replace("4,4,4", "4,4"),
        format!("{BASE}chromatic_tail_only = true\n"),
        format!("{BASE}motion_threshold = 3\n"),
    ] {
        let b = MotionSnapshot::from_ini_str(&changed).unwrap();
        assert!(settings_differ(&a, &b), "expected a difference for:\n{changed}");
    }
}

#[test]
fn saving_copies_the_config() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = root.path().join("BehaveAI_settings.ini");
    write(&config, BASE);

    let model_dir = root.path().join("models/motion_v1");
    let saved = save_settings_with_model(&model_dir, &config).unwrap();
    assert_eq!(saved, model_dir.join("saved_settings.ini"));
    assert_eq!(fs::read_to_string(&saved).unwrap(), BASE);
}

#[test]
fn saving_a_missing_config_fails() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let result = save_settings_with_model(root.path().join("m"), root.path().join("none.ini"));
    assert!(result.is_err());
    assert!(!root.path().join("m").exists());
}

#[test]
fn newest_snapshot_wins() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let older = root.path().join("a/saved_settings.ini");
    let newer = root.path().join("b/deep/saved_settings.ini");
    write(&older, BASE);
    thread::sleep(Duration::from_millis(50));
    write(&newer, BASE);

    assert_eq!(find_saved_settings(root.path()), Some(newer));
}

#[test]
fn no_snapshot_found() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    assert_eq!(find_saved_settings(root.path()), None);
}

#[test]
fn motion_model_detection() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    assert!(!any_motion_model_exists(root.path(), &[]));

    train_model(&root.path().join("static_model"));
    assert!(!any_motion_model_exists(root.path(), &[]));

    let explicit = root.path().join("custom");
    train_model(&explicit);
    assert!(any_motion_model_exists(root.path(), &[explicit]));

    train_model(&root.path().join("runs/bee_motion_v2"));
    assert!(any_motion_model_exists(root.path(), &[]));
}

#[test]
fn first_build_is_not_a_change() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = root.path().join("BehaveAI_settings.ini");
    write(&config, BASE);

    let check = check_settings(&config, None, &[], root.path()).unwrap();
    assert_eq!(check, SettingsCheck::NoSnapshot { model_exists: false });
    assert!(!check.is_changed());
}

#[test]
fn model_without_snapshot_is_a_change() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = root.path().join("BehaveAI_settings.ini");
    write(&config, BASE);
    train_model(&root.path().join("model_motion"));

    assert!(check_settings_changed(&config, None, &[], root.path()).unwrap());
}

#[test]
fn snapshot_in_model_dir_is_compared() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = root.path().join("BehaveAI_settings.ini");
    write(&config, BASE);
    let model_dir = root.path().join("model_motion");
    save_settings_with_model(&model_dir, &config).unwrap();

    let dirs = vec![model_dir.clone()];
    assert!(!check_settings_changed(&config, None, &dirs, root.path()).unwrap());

    write(&config, &BASE.replace("expB = 0.8", "expB = 0.9"));
    let check = check_settings(&config, None, &dirs, root.path()).unwrap();
    match check {
        SettingsCheck::Changed { snapshot, current, saved } => {
            assert_eq!(snapshot, model_dir.join("saved_settings.ini"));
            assert_eq!(current.exp_b, 0.9);
            assert_eq!(saved.exp_b, 0.8);
        }
        other => panic!("expected a change, got {other:?}"),
    }
}

#[test]
fn explicit_snapshot_takes_priority() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = root.path().join("BehaveAI_settings.ini");
    write(&config, BASE);
    write(&root.path().join("found/saved_settings.ini"), BASE);
    let explicit = root.path().join("explicit.ini");
    write(&explicit, &BASE.replace("frame_skip = 1", "frame_skip = 0"));

    assert!(check_settings_changed(&config, Some(explicit.as_path()), &[], root.path()).unwrap());
    assert!(!check_settings_changed(&config, None, &[], root.path()).unwrap());
}

#[test]
fn missing_current_config_is_an_error() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let result = check_settings(&root.path().join("nope.ini"), None, &[], root.path());
    assert!(result.is_err());
}
