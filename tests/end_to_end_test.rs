#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Stands in for `python3`: `-m venv DIR` lays out a stub environment whose
/// tools log their arguments to DIR/calls.log.
const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" != "-m" ] || [ "$2" != "venv" ]; then
    exit 1
fi
mkdir -p "$3/bin"
cat > "$3/bin/python" <<'EOF'
#!/bin/sh
echo "python $*" >> "$(dirname "$0")/../calls.log"
EOF
cat > "$3/bin/pip" <<'EOF'
#!/bin/sh
root="$(dirname "$0")/.."
echo "pip $*" >> "$root/calls.log"
case "$1" in
    install)
        if [ "$2" != "-r" ]; then
            echo "Django==5.0" >> "$root/installed.txt"
        fi
        ;;
    freeze)
        cat "$root/installed.txt" 2>/dev/null
        ;;
esac
exit 0
EOF
cat > "$3/bin/django-admin" <<'EOF'
#!/bin/sh
echo "django-admin $*" >> "$(dirname "$0")/../calls.log"
if [ "$1" = "startproject" ]; then
    mkdir -p "$2"
    touch manage.py
fi
EOF
chmod +x "$3/bin/python" "$3/bin/pip" "$3/bin/django-admin"
"#;

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

struct Project {
    tools: TempDir,
    dir: TempDir,
}

impl Project {
    /// An empty working directory whose config points at the fake python.
    fn new() -> Self {
        let tools = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let python = tools.path().join("python3");
        write_script(&python, FAKE_PYTHON);
        fs::write(
            tools.path().join("djmake.toml"),
            format!("[variables]\nsystem_python = \"{}\"\n", python.display()),
        )
        .unwrap();
        Self { tools, dir }
    }

    fn config(&self) -> PathBuf {
        self.tools.path().join("djmake.toml")
    }

    fn djmake(&self) -> Command {
        let mut cmd = Command::cargo_bin("djmake").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("OS")
            .env_remove("RUST_LOG")
            .env("DJMAKE_CONFIG", self.config())
            .env("NO_COLOR", "1");
        cmd
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.path("venv/calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[test]
fn test_venv_install_then_create_project() {
    let project = Project::new();

    project.djmake().arg("venv").assert().success();
    assert!(project.path("venv/bin/python").is_file());
    assert_eq!(project.calls(), vec!["python -m pip install --upgrade pip"]);

    fs::write(project.path("requirements.txt"), "requests\n").unwrap();
    project.djmake().arg("install").assert().success();
    assert!(project.calls().contains(&"pip install -r requirements.txt".to_string()));

    project
        .djmake()
        .args(["--no-input", "create_project", "demo"])
        .assert()
        .success();
    let manifest = fs::read_to_string(project.path("requirements.txt")).unwrap();
    assert!(manifest.contains("Django"), "manifest was {:?}", manifest);
    assert!(project.path("manage.py").is_file());
    assert!(project
        .calls()
        .contains(&"django-admin startproject demo .".to_string()));
}

#[test]
fn test_missing_venv_is_created_on_demand() {
    let project = Project::new();

    project.djmake().arg("migrate").assert().success();
    assert!(project.path("venv/bin/python").is_file());
    assert_eq!(
        project.calls(),
        vec![
            "python -m pip install --upgrade pip",
            "python manage.py migrate",
        ]
    );
}

#[test]
fn test_install_without_manifest_never_starts_pip() {
    let project = Project::new();
    project.djmake().arg("venv").assert().success();

    project
        .djmake()
        .arg("install")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("requirements.txt not found"));
    assert!(!project.calls().iter().any(|c| c.starts_with("pip")));
}

#[test]
fn test_create_project_without_name_fails() {
    let project = Project::new();
    project
        .djmake()
        .arg("create_project")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Project name is required"));
    assert!(!project.path("venv").exists());
    assert!(!project.path("requirements.txt").exists());
}

#[test]
fn test_failing_step_status_passes_through() {
    let project = Project::new();
    let failing = project.path("failing-python");
    write_script(
        &failing,
        "#!/bin/sh\necho \"$*\" >> \"$(dirname \"$0\")/failures.log\"\nexit 3\n",
    );
    fs::write(
        project.path("djmake.toml"),
        format!("[variables]\npython = \"{}\"\n", failing.display()),
    )
    .unwrap();

    project
        .djmake()
        .env_remove("DJMAKE_CONFIG")
        .arg("coverage")
        .assert()
        .code(3);
    let log = fs::read_to_string(project.path("failures.log")).unwrap();
    assert_eq!(log.lines().collect::<Vec<_>>(), vec!["-m coverage run manage.py test"]);
}

#[test]
fn test_clean_is_idempotent() {
    let project = Project::new();
    fs::create_dir_all(project.path("app/__pycache__")).unwrap();
    fs::create_dir_all(project.path("app/sub/__pycache__")).unwrap();
    fs::write(project.path("app/__pycache__/models.cpython-312.pyc"), "x").unwrap();
    fs::write(project.path("app/sub/__pycache__/views.cpython-312.pyc"), "x").unwrap();
    fs::write(project.path("app/legacy.pyc"), "x").unwrap();
    fs::write(project.path("app/old.pyo"), "x").unwrap();
    fs::write(project.path("app/models.py"), "x").unwrap();

    project.djmake().arg("clean").assert().success();
    project.djmake().arg("clean").assert().success();

    let leftovers: Vec<_> = WalkDir::new(project.dir.path())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name == "__pycache__" || name.ends_with(".pyc") || name.ends_with(".pyo")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
    assert!(project.path("app/models.py").is_file());
    assert!(!project.path("venv").exists());
}

#[test]
fn test_relative_chdir_runs_venv_tools() {
    let project = Project::new();
    fs::create_dir_all(project.path("proj/venv/bin")).unwrap();
    write_script(
        &project.path("proj/venv/bin/python"),
        "#!/bin/sh\necho \"$VIRTUAL_ENV\"\n",
    );

    let output = project
        .djmake()
        .args(["-C", "proj", "check"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let virtual_env = String::from_utf8(output.stdout).unwrap();
    let virtual_env = Path::new(virtual_env.trim());
    assert!(virtual_env.is_absolute(), "VIRTUAL_ENV was {:?}", virtual_env);
    assert!(virtual_env.ends_with("proj/venv"));
}
