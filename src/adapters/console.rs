//! Console Adapter - Line Commands In, Rendered Events Out
//!
//! Stands in for the presentation layer: stdin lines are parsed into
//! `Command`s for the engine and every `SessionEvent` is rendered as a
//! plain text line on stdout. Logs go to stderr so the two never mix.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::alert::parse_alert_price;
use crate::domain::mentor::Tool;
use crate::domain::trendline::Anchor;
use crate::domain::{AlertCondition, Direction, Timeframe};
use crate::usecases::{Command, SessionEvent};

pub const HELP: &str = "\
commands:
  buy | sell                 select a direction
  execute | cancel           settle or drop the selection
  size <amount>              position size
  risk <percent>             risk percent
  alert <price> [above|below]
  unalert <id> | alerts
  lesson <id>                complete a lesson
  ask <question>             talk to the mentor
  tool <name>                tool tip (trendline, horizontal, fibonacci, patterns, indicators, clear)
  line <i1> <p1> <i2> <p2>   draw a trend line
  setup | stats | history
  asset <symbol>             switch asset (btc, ETH/USD, ...)
  assets [search]            list or search the asset catalog
  timeframe <tf>             1m, 5m, 15m, 1h, 4h or 1d
  newchart                   fresh chart data
  quit";

/// Parse one input line. Errors are user-facing messages.
pub fn parse_command(line: &str) -> Result<Command, String> {
  let line = line.trim();
  let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
  let rest = rest.trim();
  let args: Vec<&str> = rest.split_whitespace().collect();

  match verb.to_lowercase().as_str() {
    "buy" => Ok(Command::Select(Direction::Buy)),
    "sell" => Ok(Command::Select(Direction::Sell)),
    "cancel" => Ok(Command::Cancel),
    "execute" | "confirm" => Ok(Command::Execute),
    "size" => parse_decimal(args.first(), "size <amount>").map(Command::SetPositionSize),
    "risk" => parse_decimal(args.first(), "risk <percent>").map(Command::SetRiskPercent),
    "alert" => {
      let raw = args.first().ok_or("usage: alert <price> [above|below]")?;
      let price = parse_alert_price(raw).map_err(|e| e.to_string())?;
      let condition = match args.get(1).map(|s| s.to_lowercase()) {
        None => None,
        Some(c) if c == "above" => Some(AlertCondition::Above),
        Some(c) if c == "below" => Some(AlertCondition::Below),
        Some(c) => return Err(format!("unknown condition '{c}', expected above or below")),
      };
      Ok(Command::AddAlert { price, condition })
    }
    "unalert" => {
      let raw = args.first().ok_or("usage: unalert <id>")?;
      Uuid::parse_str(raw)
        .map(Command::RemoveAlert)
        .map_err(|_| format!("'{raw}' is not an alert id"))
    }
    "alerts" => Ok(Command::ListAlerts),
    "lesson" if !rest.is_empty() => Ok(Command::CompleteLesson(rest.to_string())),
    "lesson" => Err("usage: lesson <id>".to_string()),
    "ask" if !rest.is_empty() => Ok(Command::Ask(rest.to_string())),
    "ask" => Err("usage: ask <question>".to_string()),
    "tool" => args
      .first()
      .and_then(|name| Tool::parse(name))
      .map(Command::ToolTip)
      .ok_or_else(|| "usage: tool <trendline|horizontal|fibonacci|patterns|indicators|clear>".to_string()),
    "line" => {
      let nums: Vec<f64> = args.iter().filter_map(|a| a.parse().ok()).collect();
      match nums.as_slice() {
        [i1, p1, i2, p2] if args.len() == 4 => Ok(Command::DrawLine {
          start: Anchor { index: *i1, price: *p1 },
          end: Anchor { index: *i2, price: *p2 },
        }),
        _ => Err("usage: line <index1> <price1> <index2> <price2>".to_string()),
      }
    }
    "setup" | "analyze" => Ok(Command::Setup),
    "asset" => args
      .first()
      .map(|s| Command::ChangeAsset((*s).to_string()))
      .ok_or_else(|| "usage: asset <symbol>".to_string()),
    "assets" => Ok(Command::ListAssets(rest.to_string())),
    "timeframe" | "tf" => {
      let raw = args.first().ok_or("usage: timeframe <1m|5m|15m|1h|4h|1d>")?;
      raw.parse::<Timeframe>().map(Command::ChangeTimeframe).map_err(|e| e.to_string())
    }
    "newchart" => Ok(Command::NewChart),
    "stats" => Ok(Command::Stats),
    "history" => Ok(Command::History),
    "quit" | "exit" => Ok(Command::Quit),
    "" => Err(String::new()),
    other => Err(format!("unknown command '{other}', type help")),
  }
}

fn parse_decimal(raw: Option<&&str>, usage: &str) -> Result<Decimal, String> {
  let raw = raw.ok_or_else(|| format!("usage: {usage}"))?;
  raw.replace(',', "").parse().map_err(|_| format!("'{raw}' is not a number"))
}

fn signed(amount: Decimal) -> String {
  if amount.is_sign_negative() {
    format!("-${}", amount.abs())
  } else {
    format!("+${amount}")
  }
}

/// Render one event as display text.
pub fn render_event(event: &SessionEvent) -> String {
  match event {
    SessionEvent::Selected { pending, analysis } => format!(
      "{} selected: {} @ ${} (risk {}%)\n  sensei: {analysis}",
      pending.direction, pending.asset, pending.position_size, pending.risk_percent
    ),
    SessionEvent::Cancelled => "selection cancelled".to_string(),
    SessionEvent::TradeSettled(r) => {
      let rec = &r.record;
      format!(
        "{} {} | {} {} -> {} | balance ${} | win rate {}% | +{} XP\n  sensei: {}",
        if rec.is_win { "Trade Won!" } else { "Trade Lost" },
        signed(rec.profit),
        rec.direction,
        rec.entry_price,
        rec.exit_price,
        r.balance,
        r.win_rate,
        r.xp_awarded,
        r.mentor
      )
    }
    SessionEvent::LevelUp(e) => format!(
      "LEVEL UP! level {} (next at {} XP, {} signals unlocked)",
      e.level, e.xp_needed, e.signals_unlocked
    ),
    SessionEvent::AchievementUnlocked(id) => format!("Achievement unlocked: {id}"),
    SessionEvent::LessonCompleted { lesson, xp } => format!("lesson '{lesson}' completed, +{xp} XP"),
    SessionEvent::Mentor(line) => format!("sensei: {line}"),
    SessionEvent::Warning(msg) => format!("! {msg}"),
    SessionEvent::PositionSizeChanged(size) => format!("position size ${size}"),
    SessionEvent::RiskPercentChanged(pct) => format!("risk {pct}%"),
    SessionEvent::AlertAdded(a) => format!(
      "alert {} set: {} {:?} ${}",
      a.id, a.asset, a.condition, a.target_price
    ),
    SessionEvent::AlertRemoved(id) => format!("alert {id} removed"),
    SessionEvent::AlertTriggered(t) => format!(
      "ALERT: {} crossed ${} ({:?}), now ${}",
      t.asset, t.target_price, t.condition, t.price
    ),
    SessionEvent::Alerts(alerts) if alerts.is_empty() => "no alerts".to_string(),
    SessionEvent::Alerts(alerts) => {
      let mut out = String::from("alerts:");
      for a in alerts {
        let state = if a.active { "active" } else { "triggered" };
        let _ = write!(out, "\n  {} {:?} ${} [{state}]", a.id, a.condition, a.target_price);
      }
      out
    }
    SessionEvent::TrendLineAdded(l) => format!(
      "trend line {} ({}) added with {} touches",
      l.id,
      l.kind,
      l.touches.len()
    ),
    SessionEvent::TrendLineTouched(t) if t.entry_ready => format!(
      "3rd touch on {} ({}): ready for entry, wait for break of structure",
      t.line_id, t.kind
    ),
    SessionEvent::TrendLineTouched(t) => format!("touch {}/3 on {} ({})", t.touches, t.line_id, t.kind),
    SessionEvent::Setup(a) => format!(
      "setup {} ({}): touches {}/3, {}\n  entry: {}\n  stop: {}\n  target: {}\n  structure: {}\n  session: {}",
      a.line_id,
      a.kind,
      a.touches,
      a.recommendation,
      a.entry_condition,
      a.stop_loss,
      a.take_profit,
      a.structure,
      if a.session_active {
        "London Session Active"
      } else {
        "Outside London Session"
      }
    ),
    SessionEvent::ChartLoaded { asset, timeframe, price } => format!(
      "switched to {} ({}) {timeframe} @ ${price}",
      asset.symbol, asset.name
    ),
    SessionEvent::Assets(assets) if assets.is_empty() => "no matching assets".to_string(),
    SessionEvent::Assets(assets) => {
      let mut out = String::from("assets:");
      for a in assets {
        let _ = write!(out, "\n  {:<10} {:<13} ${} {:+.1}%", a.symbol, a.name, a.price, a.change);
      }
      out
    }
    SessionEvent::Stats {
      stats: s,
      price,
      session_active,
      countdown,
    } => format!(
      "level {} ({}/{} XP) | balance ${} | trades {} ({}W/{}L, {}%) | streak {} (best {}) | profit ${} | \
       lessons {} | achievements {} | signals {} | {} min trained\n  price ${price} | size ${} risk {}% | \
       session {} ({countdown}) | {} active alerts",
      s.level,
      s.xp,
      s.xp_needed,
      s.balance,
      s.total_trades,
      s.wins,
      s.losses,
      s.win_rate,
      s.win_streak,
      s.best_streak,
      s.profit,
      s.lessons_completed,
      s.achievements,
      s.signals_unlocked,
      s.training_minutes,
      s.position_size,
      s.risk_percent,
      if *session_active { "ACTIVE" } else { "CLOSED" },
      s.active_alerts
    ),
    SessionEvent::History(records) if records.is_empty() => "no trades yet".to_string(),
    SessionEvent::History(records) => {
      let mut out = String::from("recent trades:");
      for r in records {
        let _ = write!(
          out,
          "\n  {} {} {} @ {} {}",
          r.timestamp.format("%H:%M:%S"),
          r.direction,
          r.asset,
          r.entry_price,
          signed(r.profit)
        );
      }
      out
    }
    SessionEvent::ConfigReloaded => "config reloaded".to_string(),
    SessionEvent::Shutdown => "dojo closed, progress saved".to_string(),
  }
}

/// Forward stdin lines to the engine until EOF, `quit` or shutdown.
pub async fn read_commands(commands: mpsc::Sender<Command>, mut shutdown_rx: broadcast::Receiver<()>) {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  println!("{HELP}");

  loop {
    tokio::select! {
      biased;
      _ = shutdown_rx.recv() => break,
      line = lines.next_line() => {
        let line = match line {
          Ok(Some(line)) => line,
          Ok(None) => {
            debug!("stdin closed");
            let _ = commands.send(Command::Quit).await;
            break;
          }
          Err(e) => {
            warn!(error = %e, "Failed to read stdin");
            break;
          }
        };
        if line.trim().eq_ignore_ascii_case("help") {
          println!("{HELP}");
          continue;
        }
        match parse_command(&line) {
          Ok(cmd) => {
            let quit = cmd == Command::Quit;
            if commands.send(cmd).await.is_err() || quit {
              break;
            }
          }
          Err(msg) if msg.is_empty() => {}
          Err(msg) => println!("! {msg}"),
        }
      }
    }
  }
  info!("Console input stopped");
}

/// Print every published event until the engine shuts down.
pub async fn render_events(mut events: broadcast::Receiver<SessionEvent>) {
  loop {
    match events.recv().await {
      Ok(event) => {
        println!("{}", render_event(&event));
        if event == SessionEvent::Shutdown {
          break;
        }
      }
      Err(broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "Renderer lagged"),
      Err(broadcast::error::RecvError::Closed) => break,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_parse_basic_commands() {
    assert_eq!(parse_command("BUY"), Ok(Command::Select(Direction::Buy)));
    assert_eq!(parse_command("  execute "), Ok(Command::Execute));
    assert_eq!(parse_command("size 1,500"), Ok(Command::SetPositionSize(dec!(1500))));
    assert_eq!(parse_command("risk 1.5"), Ok(Command::SetRiskPercent(dec!(1.5))));
    assert_eq!(parse_command("quit"), Ok(Command::Quit));
  }

  #[test]
  fn test_parse_alert() {
    assert_eq!(
      parse_command("alert 46000 below"),
      Ok(Command::AddAlert {
        price: dec!(46000),
        condition: Some(AlertCondition::Below)
      })
    );
    assert_eq!(
      parse_command("alert 46000"),
      Ok(Command::AddAlert {
        price: dec!(46000),
        condition: None
      })
    );
    assert!(parse_command("alert -5").is_err());
    assert!(parse_command("alert 5 sideways").is_err());
  }

  #[test]
  fn test_parse_free_text() {
    assert_eq!(
      parse_command("ask how do I manage risk?"),
      Ok(Command::Ask("how do I manage risk?".to_string()))
    );
    assert_eq!(parse_command("lesson trend-lines"), Ok(Command::CompleteLesson("trend-lines".to_string())));
    assert!(parse_command("ask").is_err());
  }

  #[test]
  fn test_parse_line_and_tool() {
    assert_eq!(
      parse_command("line 10 45000 80 46000"),
      Ok(Command::DrawLine {
        start: Anchor { index: 10.0, price: 45000.0 },
        end: Anchor { index: 80.0, price: 46000.0 },
      })
    );
    assert!(parse_command("line 10 x 80 46000").is_err());
    assert_eq!(parse_command("tool fib"), Ok(Command::ToolTip(Tool::Fibonacci)));
  }

  #[test]
  fn test_parse_chart_commands() {
    assert_eq!(parse_command("asset eth"), Ok(Command::ChangeAsset("eth".to_string())));
    assert!(parse_command("asset").is_err());
    assert_eq!(parse_command("assets"), Ok(Command::ListAssets(String::new())));
    assert_eq!(parse_command("assets binance coin"), Ok(Command::ListAssets("binance coin".to_string())));
    assert_eq!(parse_command("timeframe 4H"), Ok(Command::ChangeTimeframe(Timeframe::H4)));
    assert!(parse_command("timeframe 2h").unwrap_err().contains("unknown timeframe"));
    assert_eq!(parse_command("newchart"), Ok(Command::NewChart));
  }

  #[test]
  fn test_render_chart_and_assets() {
    let btc = crate::domain::assets::bitcoin();
    let text = render_event(&SessionEvent::ChartLoaded {
      asset: btc.clone(),
      timeframe: Timeframe::H1,
      price: dec!(45320.50),
    });
    assert_eq!(text, "switched to BTC/USD (Bitcoin) 1H @ $45320.50");
    let text = render_event(&SessionEvent::Assets(vec![btc]));
    assert!(text.contains("BTC/USD") && text.ends_with("+1.2%"));
    assert_eq!(render_event(&SessionEvent::Assets(Vec::new())), "no matching assets");
  }

  #[test]
  fn test_unknown_command() {
    assert!(parse_command("dance").unwrap_err().contains("unknown command"));
  }

  #[test]
  fn test_render_warning_and_level_up() {
    assert_eq!(render_event(&SessionEvent::Warning("nope".to_string())), "! nope");
    let text = render_event(&SessionEvent::LevelUp(crate::domain::LevelUpEvent {
      level: 4,
      xp_needed: 120,
      signals_unlocked: 3,
    }));
    assert!(text.starts_with("LEVEL UP! level 4"));
  }
}
