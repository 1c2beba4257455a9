use std::path::Path;

use jbp_jre::{Component, ComponentContext, JreError, JreSource, OpenJdk};
use jbp_memory::{HeuristicError, MemorySettings, ResolveError};
use tempfile::TempDir;

use super::fixtures::{stub_java_tar_gz, StubHeuristic};

const VERSION: &str = "1.7.0_51";

struct Fixture {
    _tmp: TempDir,
    ctx: ComponentContext,
    component: OpenJdk,
}

fn fixture_with(heuristic: Box<dyn jbp_memory::MemoryHeuristic>) -> Fixture {
    let tmp = tempfile::tempdir().unwrap();
    let app_dir = tmp.path().join("app");
    std::fs::create_dir_all(&app_dir).unwrap();
    let archive = stub_java_tar_gz(tmp.path());

    let mut ctx = ComponentContext::new(&app_dir);
    let source = JreSource {
        version: VERSION.to_string(),
        archive,
    };
    let component = OpenJdk::new(&mut ctx, source, MemorySettings::default(), heuristic);
    Fixture {
        _tmp: tmp,
        ctx,
        component,
    }
}

fn fixture() -> Fixture {
    fixture_with(StubHeuristic::ok())
}

fn app_dir(fixture: &Fixture) -> &Path {
    fixture.ctx.app_dir()
}

#[test]
fn detects_with_id_of_openjdk_version() {
    let fixture = fixture();
    assert_eq!(fixture.component.detect(), Some(format!("openjdk={VERSION}")));
}

#[test]
fn extracts_java_from_a_gzipped_tar() {
    let fixture = fixture();
    fixture.component.compile(&fixture.ctx).unwrap();

    assert!(app_dir(&fixture).join(".openjdk/bin/java").is_file());
    assert!(app_dir(&fixture).join(".openjdk/release").is_file());
}

#[test]
fn records_java_home() {
    let fixture = fixture();
    assert_eq!(fixture.ctx.java_home.as_deref(), Some("$PWD/.openjdk"));
}

#[test]
fn adds_on_out_of_memory_error_to_java_opts() {
    let mut fixture = fixture();
    fixture.component.release(&mut fixture.ctx).unwrap();

    assert!(fixture
        .ctx
        .java_opts
        .contains("-XX:OnOutOfMemoryError=$PWD/.openjdk/bin/killjava"));
}

#[test]
fn places_killjava_with_the_diagnostics_log_substituted() {
    let fixture = fixture();
    fixture.component.compile(&fixture.ctx).unwrap();

    let killjava = app_dir(&fixture).join(".openjdk/bin/killjava");
    let script = std::fs::read_to_string(&killjava).unwrap();
    assert!(
        script.contains("}/../../.buildpack-diagnostics/buildpack.log"),
        "{script}"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&killjava).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn adds_java_io_tmpdir_to_java_opts() {
    let mut fixture = fixture();
    fixture.component.release(&mut fixture.ctx).unwrap();

    assert!(fixture.ctx.java_opts.contains("-Djava.io.tmpdir=$TMPDIR"));
}

#[test]
fn adds_the_memory_calculation_to_java_opts() {
    let mut fixture = fixture();
    fixture.component.release(&mut fixture.ctx).unwrap();

    assert!(fixture
        .ctx
        .java_opts
        .contains("`$PWD/.openjdk/bin/memcalc $PWD`"));
    assert_eq!(
        fixture.ctx.java_opts.to_env_value(),
        "-XX:OnOutOfMemoryError=$PWD/.openjdk/bin/killjava -Djava.io.tmpdir=$TMPDIR `$PWD/.openjdk/bin/memcalc $PWD`"
    );
}

#[test]
fn persists_memory_settings_for_memcalc() {
    let fixture = fixture();
    fixture.component.compile(&fixture.ctx).unwrap();

    let json = std::fs::read_to_string(app_dir(&fixture).join(".openjdk/memory.json")).unwrap();
    let settings: MemorySettings = serde_json::from_str(&json).unwrap();
    assert_eq!(settings, MemorySettings::default());

    let memcalc = std::fs::read_to_string(app_dir(&fixture).join(".openjdk/bin/memcalc")).unwrap();
    assert!(memcalc.contains("memcalc --settings"), "{memcalc}");
}

#[test]
fn installs_the_memcalc_executable_when_configured() {
    let tmp = tempfile::tempdir().unwrap();
    let executable = tmp.path().join("jbp-build");
    std::fs::write(&executable, "binary").unwrap();

    let fixture = fixture();
    let component = fixture.component.memcalc_executable(&executable);
    component.compile(&fixture.ctx).unwrap();

    let installed = fixture.ctx.app_dir().join(".openjdk/bin/jbp");
    assert_eq!(std::fs::read_to_string(installed).unwrap(), "binary");
}

#[test]
fn fails_compile_if_the_memory_heuristic_cannot_be_resolved() {
    let fixture = fixture_with(StubHeuristic::failing(HeuristicError::Resolve(
        ResolveError::InvalidWeight {
            message: "test".to_string(),
        },
    )));

    let err = fixture.component.compile(&fixture.ctx).unwrap_err();
    assert!(matches!(err, JreError::Memory(_)), "{err:?}");
    assert!(err.to_string().contains("test"), "{err}");
    assert!(!app_dir(&fixture).join(".openjdk").exists());
}
