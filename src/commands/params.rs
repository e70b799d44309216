//! Shared command parameters for all CLI commands.
//!
//! Parameter names live here, together with one factory function per option.
//! Commands compose the factories they need into their argument list, so every
//! shared option is defined exactly once.

use clap::{Arg, ArgAction};
use std::path::PathBuf;

// Commands
pub const COMMAND_UPLOAD: &str = "upload";
pub const COMMAND_DOWNLOAD: &str = "download";
pub const COMMAND_LOCALSYNC: &str = "localsync";

// Global parameter names
pub const PARAMETER_VERBOSE: &str = "verbose";
pub const PARAMETER_USERNAME: &str = "username";
pub const PARAMETER_PASSWORD: &str = "password";
pub const PARAMETER_API_KEY: &str = "api-key";
pub const PARAMETER_API_URL: &str = "api-url";
pub const PARAMETER_SCHEME: &str = "scheme";
pub const PARAMETER_HOST: &str = "host";
pub const PARAMETER_PORT: &str = "port";
pub const PARAMETER_API_ROOT: &str = "api-root";

// Command parameter names
pub const PARAMETER_REUSE: &str = "reuse";
pub const PARAMETER_LEAF_FOLDERS_AS_ITEMS: &str = "leaf-folders-as-items";
pub const PARAMETER_PARENT_TYPE: &str = "parent-type";
pub const PARAMETER_BLACKLIST: &str = "blacklist";
pub const PARAMETER_DRYRUN: &str = "dryrun";
pub const PARAMETER_PARENT_ID: &str = "parent_id";
pub const PARAMETER_LOCAL_FOLDER: &str = "local_folder";

// Environment fallbacks
pub const ENV_API_URL: &str = "GIRDER_API_URL";
pub const ENV_API_KEY: &str = "GIRDER_API_KEY";
pub const ENV_USERNAME: &str = "GIRDER_USERNAME";

fn global_option(name: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .num_args(1)
        .required(false)
        .global(true)
}

/// Create the verbose flag.
pub fn verbose_parameter() -> Arg {
    Arg::new(PARAMETER_VERBOSE)
        .short('v')
        .long(PARAMETER_VERBOSE)
        .action(ArgAction::SetTrue)
        .global(true)
        .help("Enable verbose output for debugging")
}

pub fn username_parameter() -> Arg {
    global_option(PARAMETER_USERNAME)
        .env(ENV_USERNAME)
        .help("Girder login name")
}

pub fn password_parameter() -> Arg {
    global_option(PARAMETER_PASSWORD)
        .help("Girder password; prompted for when a username is given without one")
}

pub fn api_key_parameter() -> Arg {
    global_option(PARAMETER_API_KEY)
        .env(ENV_API_KEY)
        .hide_env_values(true)
        .help("Girder API key, used instead of username and password")
}

pub fn api_url_parameter() -> Arg {
    global_option(PARAMETER_API_URL)
        .env(ENV_API_URL)
        .help("full URL to the RESTful API of a Girder server")
}

pub fn scheme_parameter() -> Arg {
    global_option(PARAMETER_SCHEME).help("URL scheme of the Girder server (default: http)")
}

pub fn host_parameter() -> Arg {
    global_option(PARAMETER_HOST).help("host name of the Girder server (default: localhost)")
}

pub fn port_parameter() -> Arg {
    global_option(PARAMETER_PORT)
        .value_parser(clap::value_parser!(u16))
        .help("port of the Girder server (default: 443 for https, 80 otherwise)")
}

pub fn api_root_parameter() -> Arg {
    global_option(PARAMETER_API_ROOT).help("relative path to the Girder REST API")
}

/// Every global option, in the order they appear in the help.
pub fn global_parameters() -> Vec<Arg> {
    vec![
        verbose_parameter(),
        username_parameter(),
        password_parameter(),
        api_key_parameter(),
        api_url_parameter(),
        scheme_parameter(),
        host_parameter(),
        port_parameter(),
        api_root_parameter(),
    ]
}

pub fn reuse_parameter() -> Arg {
    Arg::new(PARAMETER_REUSE)
        .long(PARAMETER_REUSE)
        .action(ArgAction::SetTrue)
        .help("use existing items of same name at same location or create a new one")
}

pub fn leaf_folders_as_items_parameter() -> Arg {
    Arg::new(PARAMETER_LEAF_FOLDERS_AS_ITEMS)
        .long(PARAMETER_LEAF_FOLDERS_AS_ITEMS)
        .action(ArgAction::SetTrue)
        .required(false)
        .help("upload all files in leaf folders to a single Item named after the folder")
}

pub fn parent_type_parameter() -> Arg {
    Arg::new(PARAMETER_PARENT_TYPE)
        .long(PARAMETER_PARENT_TYPE)
        .num_args(1)
        .required(false)
        .default_value("folder")
        .help("type of Girder parent target, one of (collection, folder, user)")
}

pub fn blacklist_parameter() -> Arg {
    Arg::new(PARAMETER_BLACKLIST)
        .long(PARAMETER_BLACKLIST)
        .num_args(1)
        .required(false)
        .default_value("")
        .help("comma-separated list of filenames to ignore")
}

pub fn dryrun_parameter() -> Arg {
    Arg::new(PARAMETER_DRYRUN)
        .long(PARAMETER_DRYRUN)
        .action(ArgAction::SetTrue)
        .required(false)
        .help("will not write anything to Girder, only report what would happen")
}

pub fn parent_id_parameter() -> Arg {
    Arg::new(PARAMETER_PARENT_ID)
        .required(true)
        .help("id of Girder parent target")
}

pub fn local_folder_parameter() -> Arg {
    Arg::new(PARAMETER_LOCAL_FOLDER)
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .help("path to local target folder")
}
