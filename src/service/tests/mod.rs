use super::test_helpers::{
    Script, ScriptedConverter, create_test_service, create_test_service_with, read_archive,
    run_batch, upload,
};
use super::*;
use crate::converter::PAGE_SPLIT_MARKER;
use crate::types::UploadedFile;
use std::time::Duration;

mod processing;
