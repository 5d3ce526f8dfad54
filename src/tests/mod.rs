
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Cursor;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use assert_fs::TempDir;
use maplit::btreeset;
use nix::unistd::Uid;

use crate::backuping::{self, BackupOptions, VolumeSelection};
use crate::cli::{Action, GlobalOptions};
use crate::config::Config;
use crate::core::{EmptyResult, GenericResult};
use crate::http_client::HttpClient;
use crate::restoring::{self, Replacement, RestoreOptions};
use crate::transfer::Transfer;
use crate::util::process::get_command_output;
use crate::util::prompt::Prompter;

use self::server::TestServer;

use super::run;

fn new_transfer() -> GenericResult<Transfer> {
    Ok(Transfer::new(HttpClient::new_without_proxy()?))
}

fn new_config(temp_dir: &TempDir, name: &str) -> GenericResult<Config> {
    let docker_root = temp_dir.path().join(name);
    fs::create_dir_all(docker_root.join("volumes"))?;

    let mut config = Config::new(&temp_dir.path().join("config.toml"));
    config.set_docker_root(docker_root.to_str().ok_or("Invalid temporary directory path")?)?;
    Ok(config)
}

fn list_volumes(config: &Config) -> GenericResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(config.volumes_dir())? {
        names.insert(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn is_gnu_tar() -> bool {
    let mut command = Command::new("tar");
    command.arg("--version");
    get_command_output(command).map(|version| version.contains("GNU tar")).unwrap_or(false)
}

#[test]
fn upload() -> EmptyResult {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("archive.tar");
    fs::write(&path, "archive contents")?;

    let server = TestServer::start(200, b"https://transfer.sh/AbCdE/backup.tar\n".to_vec())?;
    let url = new_transfer()?.upload(&path, server.url(), "backup.tar", Some(3))?;
    assert_eq!(url, "https://transfer.sh/AbCdE/backup.tar");

    let request = server.request()?;
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/backup.tar");
    assert_eq!(request.headers.get("max-days").map(String::as_str), Some("3"));
    assert_eq!(request.headers.get("content-type").map(String::as_str), Some("application/octet-stream"));
    assert_eq!(request.body, b"archive contents");

    Ok(())
}

#[test]
fn upload_without_expiration() -> EmptyResult {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("archive.tar");
    fs::write(&path, "")?;

    let server = TestServer::start(201, b"http://localhost/x/archive.tar".to_vec())?;
    let url = new_transfer()?.upload(&path, server.url(), "archive.tar", None)?;
    assert_eq!(url, "http://localhost/x/archive.tar");

    let request = server.request()?;
    assert!(!request.headers.contains_key("max-days"));
    assert!(request.body.is_empty());

    Ok(())
}

#[test]
fn upload_with_multiline_reply() -> EmptyResult {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("archive.tar");
    fs::write(&path, "archive contents")?;

    let server = TestServer::start(200, b"\nhttps://transfer.sh/AbCdE/backup.tar\nDelete token: xyz\n".to_vec())?;
    let url = new_transfer()?.upload(&path, server.url(), "backup.tar", None)?;
    assert_eq!(url, "https://transfer.sh/AbCdE/backup.tar");
    server.request()?;

    Ok(())
}

#[test]
fn upload_errors() -> EmptyResult {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("archive.tar");
    fs::write(&path, "archive contents")?;

    let server = TestServer::start(500, b"Storage is full\n".to_vec())?;
    let err = new_transfer()?.upload(&path, server.url(), "archive.tar", None).unwrap_err();
    assert_eq!(err.to_string(), "Upload failed: Server returned an error (500 Internal Server Error): Storage is full");
    server.request()?;

    let server = TestServer::start(200, b" \n".to_vec())?;
    let err = new_transfer()?.upload(&path, server.url(), "archive.tar", None).unwrap_err();
    assert!(err.to_string().contains("empty response"), "{}", err);
    server.request()?;

    Ok(())
}

#[test]
fn download_error() -> EmptyResult {
    let server = TestServer::start(404, Vec::new())?;
    let url = server.url().join("AbCdE/docker-volumes.tar")?;

    let mut data = Vec::new();
    let err = new_transfer()?.download(&url, &mut data).unwrap_err();
    assert!(err.to_string().starts_with("Download failed: Server returned an error"), "{}", err);

    let request = server.request()?;
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/AbCdE/docker-volumes.tar");

    Ok(())
}

#[test]
fn backup_and_restore() -> EmptyResult {
    if !is_gnu_tar() {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let mut source = new_config(&temp_dir, "source")?;
    let source_volumes = source.volumes_dir();

    for volume in ["app_db", "app_cache", "unrelated"] {
        fs::create_dir_all(source_volumes.join(volume).join("_data/nested"))?;
        fs::write(source_volumes.join(volume).join("_data/nested/file"), volume)?;
    }
    let secret_path = source_volumes.join("app_db/_data/secret");
    fs::write(&secret_path, "password")?;
    fs::set_permissions(&secret_path, fs::Permissions::from_mode(0o640))?;

    let server = TestServer::start(200, b"https://transfer.sh/AbCdE/volumes.tar\n".to_vec())?;
    source.set_endpoint(server.url().as_str())?;

    let options = BackupOptions {
        volumes: VolumeSelection::Explicit(vec![s!("app_db"), s!("app_cache"), s!("app_db")]),
        name: s!("volumes.tar"),
        max_days: None,
    };
    let url = backuping::backup(&source, &options, &new_transfer()?)?;
    assert_eq!(url, "https://transfer.sh/AbCdE/volumes.tar");

    let request = server.request()?;
    assert_eq!(request.path, "/volumes.tar");
    let archive = request.body;

    // Volumes are archived in the requested order
    let archive_path = temp_dir.path().join("uploaded.tar");
    fs::write(&archive_path, &archive)?;
    let mut command = Command::new("tar");
    command.arg("-tf").arg(&archive_path);
    let listing = get_command_output(command)?;
    let roots: Vec<&str> = listing.lines()
        .map(|path| path.split('/').next().unwrap_or(path))
        .fold(Vec::new(), |mut roots, root| {
            if roots.last() != Some(&root) {
                roots.push(root);
            }
            roots
        });
    assert_eq!(roots, ["app_db", "app_cache"]);

    // As is
    let target = new_config(&temp_dir, "target")?;
    let server = TestServer::start(200, archive.clone())?;
    let options = RestoreOptions {
        url: server.url().join("AbCdE/volumes.tar")?,
        replacements: Vec::new(),
        force: false,
    };
    restoring::restore(&target, &options, &new_transfer()?, &mut Prompter::new(Cursor::new(""), Vec::new()))?;
    server.request()?;

    assert_eq!(list_volumes(&target)?, btreeset! {s!("app_cache"), s!("app_db")});
    check_volume(&target.volumes_dir().join("app_db"), "app_db")?;
    check_volume(&target.volumes_dir().join("app_cache"), "app_cache")?;

    // Renamed over an existing volume
    let renamed = new_config(&temp_dir, "renamed")?;
    fs::create_dir_all(renamed.volumes_dir().join("prod_db/_data"))?;
    fs::write(renamed.volumes_dir().join("prod_db/_data/stale"), "stale")?;

    let server = TestServer::start(200, archive)?;
    let options = RestoreOptions {
        url: server.url().join("AbCdE/volumes.tar")?,
        replacements: vec!["app_=prod_".parse::<Replacement>()?],
        force: true,
    };
    restoring::restore(&renamed, &options, &new_transfer()?, &mut Prompter::new(Cursor::new(""), Vec::new()))?;
    server.request()?;

    assert_eq!(list_volumes(&renamed)?, btreeset! {s!("prod_cache"), s!("prod_db")});
    check_volume(&renamed.volumes_dir().join("prod_db"), "app_db")?;
    check_volume(&renamed.volumes_dir().join("prod_cache"), "app_cache")?;
    assert!(!renamed.volumes_dir().join("prod_db/_data/stale").exists());

    Ok(())
}

fn check_volume(path: &Path, contents: &str) -> EmptyResult {
    assert_eq!(fs::read_to_string(path.join("_data/nested/file"))?, contents);

    if contents == "app_db" {
        let secret_path = path.join("_data/secret");
        assert_eq!(fs::read_to_string(&secret_path)?, "password");
        assert_eq!(File::open(&secret_path)?.metadata()?.permissions().mode() & 0o777, 0o640);
    }

    Ok(())
}

#[test]
fn restore_into_missing_docker_root() -> EmptyResult {
    let temp_dir = TempDir::new()?;
    let mut config = Config::new(&temp_dir.path().join("config.toml"));
    config.set_docker_root(temp_dir.path().join("missing").to_str().ok_or("Invalid path")?)?;

    let options = RestoreOptions {
        url: "http://127.0.0.1:1/archive.tar".parse()?,
        replacements: Vec::new(),
        force: false,
    };

    let err = restoring::restore(&config, &options, &new_transfer()?, &mut Prompter::new(Cursor::new(""), Vec::new()))
        .unwrap_err();
    assert!(err.to_string().starts_with("Volumes directory doesn't exist"), "{}", err);

    Ok(())
}

fn global_options(temp_dir: &TempDir) -> GlobalOptions {
    GlobalOptions {
        log_level: log::Level::Info,
        config_path: temp_dir.path().join("config.toml"),
    }
}

fn new_docker_root(temp_dir: &TempDir) -> GenericResult<String> {
    let docker_root = temp_dir.path().join("docker");
    fs::create_dir_all(docker_root.join("volumes/db/_data"))?;
    fs::write(docker_root.join("volumes/db/_data/file"), "data")?;
    Ok(docker_root.to_str().ok_or("Invalid temporary directory path")?.to_owned())
}

fn backup_action(docker_root: &str, server: &TestServer) -> Action {
    Action::Backup {
        volumes: VolumeSelection::Explicit(vec![s!("db")]),
        docker_root: Some(docker_root.to_owned()),
        endpoint: Some(server.url().to_string()),
        name: s!("docker-volumes.tar"),
        max_days: None,
    }
}

#[test]
fn privileges_are_checked_first() -> EmptyResult {
    let temp_dir = TempDir::new()?;
    let global = global_options(&temp_dir);
    let docker_root = new_docker_root(&temp_dir)?;
    let user = Uid::from_raw(1000);

    let server = TestServer::start(200, b"https://transfer.sh/AbCdE/docker-volumes.tar\n".to_vec())?;
    let mut stdout = Vec::new();

    let err = run(backup_action(&docker_root, &server), &global, user, HttpClient::new_without_proxy, &mut stdout)
        .unwrap_err();
    assert!(err.to_string().starts_with("Permission denied: backup must be run as root"), "{}", err);
    assert!(stdout.is_empty());
    assert!(server.untouched()?);

    let server = TestServer::start(200, Vec::new())?;
    let action = Action::Restore {
        url: server.url().join("AbCdE/docker-volumes.tar")?.to_string(),
        docker_root: Some(docker_root.clone()),
        replacements: vec!["db=restored".parse::<Replacement>()?],
        force: true,
    };

    let err = run(action, &global, user, HttpClient::new_without_proxy, &mut stdout).unwrap_err();
    assert!(err.to_string().starts_with("Permission denied: restore must be run as root"), "{}", err);
    assert!(stdout.is_empty());
    assert!(server.untouched()?);

    let mut config = Config::load(&global.config_path);
    config.set_docker_root(&docker_root)?;
    assert_eq!(list_volumes(&config)?, btreeset! {s!("db")});

    Ok(())
}

#[test]
fn failed_backup_prints_nothing() -> EmptyResult {
    if !is_gnu_tar() {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let global = global_options(&temp_dir);
    let docker_root = new_docker_root(&temp_dir)?;

    let server = TestServer::start(500, b"Storage is full\n".to_vec())?;
    let mut stdout = Vec::new();

    let err = run(backup_action(&docker_root, &server), &global, Uid::from_raw(0), HttpClient::new_without_proxy, &mut stdout)
        .unwrap_err();
    assert!(err.to_string().starts_with("Upload failed"), "{}", err);
    assert!(stdout.is_empty());
    assert_eq!(server.request()?.method, "PUT");

    Ok(())
}

#[test]
fn backup_prints_only_url() -> EmptyResult {
    if !is_gnu_tar() {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let global = global_options(&temp_dir);
    let docker_root = new_docker_root(&temp_dir)?;

    let server = TestServer::start(200, b"https://transfer.sh/AbCdE/docker-volumes.tar\nDelete token: xyz\n".to_vec())?;
    let mut stdout = Vec::new();

    run(backup_action(&docker_root, &server), &global, Uid::from_raw(0), HttpClient::new_without_proxy, &mut stdout)?;
    assert_eq!(String::from_utf8(stdout)?, "https://transfer.sh/AbCdE/docker-volumes.tar\n");
    assert_eq!(server.request()?.path, "/docker-volumes.tar");

    Ok(())
}
