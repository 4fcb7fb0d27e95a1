//! Scenario tests for function hooking: fake-address redirection through
//! import slots, hook naming, and the hookability rules.

mod common;

use std::{cell::Cell as StdCell, rc::Rc};

use common::{entry, new_execution, register_value, LOAD_ADDRESS, PC};
use semantic_execution_engine::{
    address::Address,
    document::{BinaryStream, Document, Label, LabelKind, MappedRegion},
    error::execution::Error,
};

/// The address of the import slot the test program calls through.
const SLOT_ADDRESS: u64 = 0x40_0100;

/// Builds a document whose code performs an indirect call through
/// [`SLOT_ADDRESS`], with the slot itself mapped and labelled `puts` as an
/// import (and a second slot labelled `gets`).
fn import_calling_document() -> Document {
    // calli [0x400100]
    let code: Vec<u8> = vec![0x05, 0x00, 0x01, 0x40, 0x00];
    let code_len = code.len() as u64;

    // The two import slots initially hold zero; the loader (or a hook)
    // fills them in.
    let mut binary = code;
    binary.extend_from_slice(&[0u8; 8]);

    Document::new(BinaryStream::new(binary))
        .with_region(MappedRegion::new(Address::new(0, LOAD_ADDRESS), 0, code_len, 0))
        .with_region(MappedRegion::new(
            Address::new(0, SLOT_ADDRESS),
            code_len,
            8,
            0,
        ))
        .with_label(
            Address::new(0, SLOT_ADDRESS),
            Label::new("puts", LabelKind::Imported),
        )
        .with_label(
            Address::new(0, SLOT_ADDRESS + 4),
            Label::new("gets", LabelKind::Imported),
        )
        .with_label(
            Address::new(0, LOAD_ADDRESS),
            Label::new("data_blob", LabelKind::Data),
        )
}

#[test]
fn calling_a_hooked_import_fires_the_callback() -> anyhow::Result<()> {
    let mut execution = new_execution(import_calling_document())?;

    let fired = Rc::new(StdCell::new(false));
    let seen = Rc::clone(&fired);
    execution
        .hook_function(
            "puts",
            Rc::new(move |_, _| {
                seen.set(true);
                true
            }),
        )
        .expect("the import is hookable");

    assert!(execution.execute(entry()).is_ok());
    assert!(fired.get());

    // Execution parked on the fake address, so the hook table still knows
    // which function was reached.
    assert_eq!(register_value(&execution, PC), 0xdead_7700);
    assert_eq!(execution.hook_name().as_deref(), Some("puts"));

    Ok(())
}

#[test]
fn each_hooked_function_gets_its_own_fake_address() -> anyhow::Result<()> {
    let mut execution = new_execution(import_calling_document())?;

    execution
        .hook_function("puts", Rc::new(|_, _| true))
        .expect("the import is hookable");
    execution
        .hook_function("gets", Rc::new(|_, _| true))
        .expect("the import is hookable");

    // The sentinels written over the slots step by four.
    let memory = execution.memory_context().expect("the execution is initialised");
    let mut slot = [0u8; 4];
    memory.read(SLOT_ADDRESS, &mut slot).expect("the slot is mapped");
    assert_eq!(u32::from_le_bytes(slot), 0xdead_7700);
    memory.read(SLOT_ADDRESS + 4, &mut slot).expect("the slot is mapped");
    assert_eq!(u32::from_le_bytes(slot), 0xdead_7704);

    Ok(())
}

#[test]
fn a_hook_returning_false_stops_the_run() -> anyhow::Result<()> {
    let mut execution = new_execution(import_calling_document())?;

    execution
        .hook_function("puts", Rc::new(|_, _| false))
        .expect("the import is hookable");

    // The stop request is a normal termination, not a failure.
    assert!(execution.execute(entry()).is_ok());
    assert_eq!(execution.hook_name().as_deref(), Some("puts"));

    Ok(())
}

#[test]
fn only_functions_and_imports_are_hookable() -> anyhow::Result<()> {
    let mut execution = new_execution(import_calling_document())?;

    let error = execution
        .hook_function("no_such_symbol", Rc::new(|_, _| true))
        .unwrap_err();
    assert!(matches!(error.payload, Error::UnknownFunction { .. }));

    let error = execution
        .hook_function("data_blob", Rc::new(|_, _| true))
        .unwrap_err();
    assert!(matches!(error.payload, Error::NotHookable { .. }));

    Ok(())
}
