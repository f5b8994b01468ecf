use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const INFRA: &str = r#"
variables {
    name "tf-test"
}

provider "alicloud" {
    region "cn-hangzhou"
}

resource "alicloud_vpc" "default" {
    cidr_block "172.16.0.0/16"
    name "{{ name }}"
}

resource "alicloud_vswitch" "default" {
    vpc_id "${alicloud_vpc.default.id}"
    cidr_block "172.16.0.0/24"
    availability_zone "cn-hangzhou-b"
}

data "alicloud_db_instances" "dbs" {
    engine "MySQL"
    name_regex "^tf-"
}
"#;

/// A throwaway project directory with its own config home
pub struct TestProject {
    pub root: TempDir,
    pub home: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            home: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write_infra(&self, content: &str) {
        fs::write(self.root.path().join("infra.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_state(&self, content: &str) {
        let dir = self.root.path().join(".aliform");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("state.json"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// `aliform` running inside the project, isolated from the user's credentials
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("aliform").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("NO_COLOR", "1")
            .env_remove("ALIFORM_CONFIG_PATH")
            .env_remove("ALICLOUD_ACCESS_KEY")
            .env_remove("ALICLOUD_SECRET_KEY")
            .env_remove("ALICLOUD_SECURITY_TOKEN")
            .env_remove("ALICLOUD_REGION")
            .env_remove("ALICLOUD_PROFILE")
            .env_remove("RUST_LOG");
        cmd
    }
}
