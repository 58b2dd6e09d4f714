use std::collections::BTreeMap;
use std::fs;

use nmrkit_engine::{CommandTable, EngineClient, EngineError, Operation, Recipe, RecipeError, Target};

#[test]
fn verb_resolves_to_forwarded_invocation() {
    let table = CommandTable::builtin().unwrap();
    let client = EngineClient::new("java", vec!["-jar".into(), "engine.jar".into()]);

    let target = table.resolve("summary").unwrap();
    let args: Vec<String> = ["-n", "20", "final/*.pdb"].iter().map(|s| s.to_string()).collect();
    let inv = client.invocation(&target, &args);

    assert_eq!(
        inv.command_line(),
        "java -jar engine.jar summary -n 20 'final/*.pdb'"
    );
}

#[test]
fn configured_verbs_join_the_table() {
    let mut overrides = BTreeMap::new();
    overrides.insert("refine".to_string(), "refine".to_string());
    let table = CommandTable::builtin().unwrap().with_overrides(&overrides).unwrap();

    assert!(matches!(table.resolve("refine").unwrap(), Target::Entry { .. }));
    assert!(matches!(
        CommandTable::builtin().unwrap().resolve("refine"),
        Err(EngineError::UnknownCommand { .. })
    ));
}

#[test]
fn script_file_becomes_engine_argument() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("anneal.py");
    fs::write(&script, "anneal()\n").unwrap();

    let target = CommandTable::builtin().unwrap()
        .resolve(script.to_str().unwrap())
        .unwrap();
    let inv = EngineClient::new("engine", Vec::new()).invocation(&target, &["7".into()]);
    assert_eq!(inv.args, [script.display().to_string(), "7".to_string()]);
}

#[test]
fn recipe_file_round_trip_through_canonical_form() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noesy.recipe");
    fs::write(
        &path,
        "FID('noesy/fid')\nCREATE('noesy.nv')\nDIM(1)\nEXPD(lb=0.3)\nZF()\nFT()\nPHASE(-41.2, 0)\n\
         DIM(2, 3)\nGM(g1=2, g2=4)\nZF(2)\nFT()\nREAL()\nrun()\n",
    )
    .unwrap();

    let recipe = Recipe::from_file(&path).unwrap();
    assert_eq!(recipe.steps[7].op, Operation::Dim { dims: vec![2, 3] });
    assert_eq!(
        recipe.steps[8].op,
        Operation::Gm { g1: 2.0, g2: 4.0, g3: 0.0 }
    );
    assert_eq!(Recipe::parse(&recipe.to_string()).unwrap(), recipe);
}

#[test]
fn missing_recipe_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Recipe::from_file(&dir.path().join("nope.recipe")).unwrap_err();
    assert!(matches!(err, RecipeError::MissingInput { .. }));
}
