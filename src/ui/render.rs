//! 界面渲染
//!
//! 根据 UiState（phase、时间线、进度、错误）与 input_buffer 绘制：
//! 标题栏显示阶段与世界/角色进度，主体为时间线（按发送方着色、按宽度换行），
//! 底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::core::UiState;
use crate::session::{GamePhase, Sender};

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 绘制一帧：上方时间线（标题 + 历史 + 滚动条），下方输入区；
/// 将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    let input_height = 5u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(input_height)])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2).saturating_sub(1) as usize; // 边框 + 滚动条

    let mut title = format!(" AI 地下城主 │ {} ", state.phase.label());
    if matches!(
        state.phase,
        GamePhase::WorldCreation | GamePhase::CharacterCreation
    ) {
        title.push_str(&format!(
            "│ 世界 {}/{} │ 角色 {}/{} ",
            state.world_progress.0,
            state.world_progress.1,
            state.character_progress.0,
            state.character_progress.1,
        ));
    }

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    // 构建时间线内容：每条消息按宽度换行，消息之间加空行分隔
    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, m) in state.messages.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(Span::raw("")));
        }
        let (prefix, color) = match m.sender {
            Sender::Player => ("你  ", Color::Cyan),
            Sender::DungeonMaster => ("DM  ", Color::Green),
            Sender::System => ("系统", Color::Gray),
        };
        let wrapped = wrap_text(&m.text, content_width.max(40));
        for (i, line) in wrapped.into_iter().enumerate() {
            let pref = if i == 0 { prefix } else { "    " };
            text_lines.push(Line::from(vec![
                Span::styled(
                    pref,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(line),
            ]));
        }
    }

    let content_height = conv_area.height.saturating_sub(2) as usize; // 边框
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let inner = block.inner(conv_area);
    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    let input_prompt = if let Some(err) = &state.error_message {
        format!(" 错误: {} ", err.chars().take(36).collect::<String>())
    } else if state.awaiting_readiness {
        " 等待游戏准备… ".to_string()
    } else if state.input_locked {
        match state.phase {
            GamePhase::GameOver => " 游戏结束，Ctrl+N 重开 ".to_string(),
            _ => " 等待回复… ".to_string(),
        }
    } else {
        " 输入 ".to_string()
    };

    let border_color = if state.error_message.is_some() {
        Color::Red
    } else {
        Color::Blue
    };

    let hint = " Enter 发送 │ ↑↓ PgUp/PgDn 滚动 │ Ctrl+N 新游戏 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });

    f.render_widget(input, chunks[1]);

    out.0 = total_lines;
    out.1 = content_height;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_by_chars() {
        let lines = wrap_text("一二三四五六", 3);
        assert_eq!(lines, vec!["一二三".to_string(), "四五六".to_string()]);
    }

    #[test]
    fn test_wrap_text_empty() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }
}
