// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for call linkage.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;

use super::*;
use crate::platform::MockCpu;

const RAM_BASE: PhysAddr = PhysAddr::new(0x2000_0000);
const RAM_SIZE: u32 = 0x1000;

fn setup() -> (MockCpu, UserRam) {
    let ram = UserRam::new(RAM_BASE, RAM_SIZE);
    let mut cpu = MockCpu::new();
    cpu.set_reg(Reg::Sp, ram.top().as_u32());
    cpu.set_reg(Reg::Fp, ram.top().as_u32());
    for (i, reg) in Reg::GENERAL.iter().enumerate() {
        cpu.set_reg(*reg, 0x100 + i as u32);
    }
    cpu.set_reg(Reg::Pc, 0x3000_0010);
    (cpu, ram)
}

#[test]
fn capture_reads_frame_registers() {
    let (cpu, ram) = setup();
    let frame = StackFrame::capture(&cpu);

    assert_eq!(frame.r2, 0x102);
    assert_eq!(frame.r7, 0x107);
    assert_eq!(frame.sp, ram.top().as_u32());
    assert_eq!(frame.fp, ram.top().as_u32());
}

#[test]
fn words_are_in_stack_order() {
    let frame = StackFrame::from_words([1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(frame.r7, 1);
    assert_eq!(frame.r2, 6);
    assert_eq!(frame.fp, 7);
    assert_eq!(frame.sp, 8);
    assert_eq!(frame.to_words(), [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn push_writes_below_sp() {
    let (mut cpu, mut ram) = setup();
    let top = ram.top();

    StackFrame::capture(&cpu).push(&mut cpu, &mut ram).unwrap();

    let sp = top.sub(FRAME_SIZE);
    assert_eq!(cpu.reg(Reg::Sp), sp.as_u32());
    assert_eq!(ram.read_u32(sp).unwrap(), 0x107);
    assert_eq!(ram.read_u32(sp.add(20)).unwrap(), 0x102);
    assert_eq!(ram.read_u32(sp.add(28)).unwrap(), top.as_u32());
}

#[test]
fn push_outside_ram_leaves_sp() {
    let (mut cpu, mut ram) = setup();
    cpu.set_reg(Reg::Sp, RAM_BASE.add(16).as_u32());

    let err = StackFrame::capture(&cpu).push(&mut cpu, &mut ram);
    assert!(matches!(err, Err(Fault::BusError(_))));
    assert_eq!(cpu.reg(Reg::Sp), RAM_BASE.add(16).as_u32());
    assert!(ram.raw_memory().iter().all(|b| *b == 0));
}

#[test]
fn call_links_and_jumps() {
    let (mut cpu, mut ram) = setup();
    let target = PhysAddr::new(0x3000_0100);

    call(&mut cpu, &mut ram, target).unwrap();

    assert_eq!(cpu.reg(Reg::Pc), target.as_u32());
    assert_eq!(cpu.reg(Reg::Lr), 0x3000_0010);
    assert_eq!(cpu.reg(Reg::Sp), ram.top().sub(FRAME_SIZE).as_u32());
}

#[test]
fn ret_restores_caller() {
    let (mut cpu, mut ram) = setup();
    let before = *cpu.regs();

    call(&mut cpu, &mut ram, PhysAddr::new(0x3000_0100)).unwrap();

    // Callee clobbers everything it is allowed to
    for reg in Reg::GENERAL {
        cpu.set_reg(reg, 0xDEAD);
    }
    cpu.set_reg(Reg::Fp, 0xBEEF);

    ret(&mut cpu, &ram).unwrap();

    for reg in [Reg::R2, Reg::R3, Reg::R4, Reg::R5, Reg::R6, Reg::R7] {
        assert_eq!(cpu.reg(reg), before[reg.index()], "{reg}");
    }
    assert_eq!(cpu.reg(Reg::Fp), before[Reg::Fp.index()]);
    assert_eq!(cpu.reg(Reg::Sp), before[Reg::Sp.index()]);
    assert_eq!(cpu.reg(Reg::Pc), 0x3000_0010);
    // r0/r1 carry results back
    assert_eq!(cpu.reg(Reg::R0), 0xDEAD);
}

#[test]
fn nested_calls_unwind_in_order() {
    let (mut cpu, mut ram) = setup();
    let top = ram.top().as_u32();

    call(&mut cpu, &mut ram, PhysAddr::new(0x3000_0100)).unwrap();
    cpu.set_reg(Reg::R4, 0x44);
    call(&mut cpu, &mut ram, PhysAddr::new(0x3000_0200)).unwrap();
    assert_eq!(cpu.reg(Reg::Sp), top - 2 * FRAME_SIZE);

    ret(&mut cpu, &ram).unwrap();
    assert_eq!(cpu.reg(Reg::R4), 0x44);
    assert_eq!(cpu.reg(Reg::Sp), top - FRAME_SIZE);
    assert_eq!(cpu.reg(Reg::Pc), 0x3000_0100);

    // LR is not part of the frame, so the outer return goes back to the
    // inner call site as well
    ret(&mut cpu, &ram).unwrap();
    assert_eq!(cpu.reg(Reg::R4), 0x104);
    assert_eq!(cpu.reg(Reg::Sp), top);
}

#[test]
fn ret_outside_ram_faults() {
    let (mut cpu, ram) = setup();
    cpu.set_reg(Reg::Sp, ram.top().as_u32());

    assert!(matches!(ret(&mut cpu, &ram), Err(Fault::BusError(_))));
}

proptest! {
    #[test]
    fn push_then_pop_is_identity(words in any::<[u32; 8]>(), depth in 0u32..64) {
        let (mut cpu, mut ram) = setup();
        let sp = ram.top().sub(depth * 4);
        cpu.set_reg(Reg::Sp, sp.as_u32());

        let frame = StackFrame::from_words(words);
        frame.push(&mut cpu, &mut ram).unwrap();
        let popped = StackFrame::pop(&mut cpu, &ram).unwrap();

        prop_assert_eq!(popped, frame);
        prop_assert_eq!(cpu.reg(Reg::Sp), sp.as_u32());
    }
}
