//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use crate::cpu::Reg;
use super::app::{DebuggerApp, MEMORY_ROW};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Percentage(45),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(9),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw disassembly view around PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:04X}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw all sixteen registers plus engine state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let engine = &app.machine.engine;
    let regs = &engine.regs;

    let mut content: Vec<Line> = Reg::ALL
        .chunks(4)
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .flat_map(|&reg| {
                    let value = regs.read(reg);
                    let style = if value == 0 {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    [
                        Span::raw(format!("{:>8} ", reg.name())),
                        Span::styled(format!("{:02X}", value), style),
                    ]
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    content.push(Line::from(vec![
        Span::raw("Z: "),
        Span::styled(format!("{}", regs.zero() as u8), flag_style(regs.zero())),
        Span::raw("  C: "),
        Span::styled(format!("{}", regs.carry() as u8), flag_style(regs.carry())),
        Span::raw("  Phase: "),
        Span::styled(format!("{:?}", engine.phase()), Style::default().fg(Color::Yellow)),
        Span::raw(format!("  Pending: {}", engine.pending())),
    ]));

    let bus = engine.bus();
    content.push(Line::from(vec![
        Span::raw("Bus: "),
        Span::styled(
            format!("{}", bus),
            if bus.is_write() {
                Style::default().fg(Color::Magenta)
            } else {
                Style::default().fg(Color::Cyan)
            },
        ),
        Span::raw("   Ticks: "),
        Span::styled(format!("{}", engine.ticks), Style::default().fg(Color::Cyan)),
        Span::raw("   Instr: "),
        Span::styled(format!("{}", engine.retired), Style::default().fg(Color::Cyan)),
        Span::raw("   Reset: "),
        Span::styled(
            format!("{}", app.machine.reset_asserted()),
            if app.machine.reset_asserted() {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Green)
            },
        ),
    ]));

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory hex view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let regs = &app.machine.engine.regs;
    let pc = regs.pc() as usize;
    let pointer = regs.pointer() as usize;

    let items: Vec<ListItem> = (app.mem_scroll..)
        .take(visible_rows)
        .map(|row| row * MEMORY_ROW)
        .take_while(|&base| base < crate::cpu::memory::MEMORY_SIZE)
        .map(|base| {
            let bytes = app.machine.mem.slice(base as u16, MEMORY_ROW);
            let mut spans = vec![Span::styled(
                format!("{:04X}: ", base),
                Style::default().fg(Color::DarkGray),
            )];

            for (i, byte) in bytes.iter().enumerate() {
                let addr = base + i;
                let style = if addr == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if addr == pointer {
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
                } else if *byte != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02X} ", byte), style));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  t: Tick  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  m: Go to pointer  ↑↓/PgUp/PgDn: Scroll"),
        Line::from("q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Color for a flag bit.
fn flag_style(set: bool) -> Style {
    if set {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    }
}
