//! Command table and handlers
//!
//! The table is closed: ids 1..=8, fixed at compile time, listed in menu
//! order. Anything else is an illegal choice.

use core::fmt::Write;

use super::io::ConsoleIo;
use super::line_buffer::ConsoleLine;
use super::parser::parse_duty;
use super::ConsoleError;
use crate::log_globals::LOG_STREAM;
use crate::motor::MotorSubsystem;
use crate::{log_debug, log_info};

/// Everything a handler may touch.
pub struct HandlerContext<'a> {
    pub motor: &'a mut dyn MotorSubsystem,
    pub io: &'a mut dyn ConsoleIo,
    /// Buffer for further input. Holds the offending text when a handler
    /// fails on a value it read.
    pub line: &'a mut ConsoleLine,
}

/// Handler signature shared by every command.
pub type Handler = fn(&mut HandlerContext<'_>) -> Result<(), ConsoleError>;

/// Command descriptor
pub struct Command {
    pub id: i32,
    pub label: &'static str,
    pub handler: Handler,
}

/// All available commands, in menu order
pub static COMMANDS: &[Command] = &[
    Command { id: 1, label: "init", handler: cmd_init },
    Command { id: 2, label: "read adc", handler: cmd_read_adc },
    Command { id: 3, label: "set pwm duty", handler: cmd_set_pwm_duty },
    Command { id: 4, label: "set direction - forward", handler: cmd_direction_forward },
    Command { id: 5, label: "set direction - reverse", handler: cmd_direction_reverse },
    Command { id: 6, label: "brake", handler: cmd_brake },
    Command { id: 7, label: "zero encoder", handler: cmd_zero_encoder },
    Command { id: 8, label: "get encoder", handler: cmd_get_encoder },
];

/// Look up a command by menu id
pub fn find(id: i32) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.id == id)
}

/// Run the handler for `choice`
pub fn dispatch(choice: i32, ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    let command = find(choice).ok_or(ConsoleError::IllegalChoice)?;
    log_debug!(LOG_STREAM, "console", "dispatch {} ({})", command.id, command.label);
    (command.handler)(ctx)
}

/// Print the test menu preceded by the free-heap estimate
pub fn print_menu(out: &mut dyn Write, heap_free: u32) {
    let _ = writeln!(out);
    let _ = writeln!(out, "heap-free: {}", heap_free);
    let _ = writeln!(out, "-----------------------------------");
    let _ = writeln!(out, "--          TEST MENU            --");
    let _ = writeln!(out, "-----------------------------------");
    for c in COMMANDS {
        let _ = writeln!(out, " {}. {}", c.id, c.label);
    }
    let _ = writeln!(out);
}

// --- Command Implementations ---

fn cmd_init(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    ctx.motor.init();
    log_info!(LOG_STREAM, "motor", "subsystem initialized");
    Ok(())
}

fn cmd_read_adc(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    let adc = ctx.motor.read_adc();
    let _ = writeln!(
        ctx.io,
        "ADC : {:04} - 0x{:03x} - {:04}mV",
        adc.raw, adc.raw, adc.millivolts
    );
    Ok(())
}

fn cmd_set_pwm_duty(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    let _ = write!(ctx.io, "Enter duty value[0-65535]: ");

    ctx.io.read_line(ctx.line)?;

    let duty = parse_duty(ctx.line.as_str()).ok_or(ConsoleError::InvalidValue)?;
    ctx.motor.set_pwm_duty(duty);
    log_info!(LOG_STREAM, "motor", "duty {}", duty);
    Ok(())
}

fn cmd_direction_forward(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    ctx.motor.set_direction(true);
    log_info!(LOG_STREAM, "motor", "direction forward");
    Ok(())
}

fn cmd_direction_reverse(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    ctx.motor.set_direction(false);
    log_info!(LOG_STREAM, "motor", "direction reverse");
    Ok(())
}

fn cmd_brake(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    ctx.motor.brake();
    log_info!(LOG_STREAM, "motor", "brake");
    Ok(())
}

fn cmd_zero_encoder(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    ctx.motor.zero_encoder();
    log_info!(LOG_STREAM, "motor", "encoder zeroed");
    Ok(())
}

fn cmd_get_encoder(ctx: &mut HandlerContext<'_>) -> Result<(), ConsoleError> {
    let pos = ctx.motor.get_encoder_position();
    let _ = writeln!(
        ctx.io,
        "POS : {:04} - 0x{:03x} - DEG : {:03}",
        pos.ticks, pos.ticks, pos.degrees
    );
    Ok(())
}
