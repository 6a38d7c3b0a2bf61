use std::net::Ipv4Addr;

use anyhow::{Context, Result, bail};
use domain::common::entity::{Protocol, RuleId};
use domain::firewall::entity::{Disposition, InboundPacket, PacketInfo};
use ports::primary::firewall_control::FirewallControlPort;
use ports::secondary::buffer_pool_port::BufferPoolPort;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::commands::render_listing;
use crate::startup::Runtime;

const HELP: &str = "\
commands (first word is case-insensitive):
  ADD <src>-<sport>-<dst>-<dport>-<proto>-<action>   append a rule (* = any, action 0 = deny)
  DEL <id>                                           remove a rule
  LIST                                               show rules in evaluation order
  PACKET <src> <dst> <proto> [<sport> <dport>]       run a synthetic IPv4 packet through the filter
  METRICS                                            print metrics in OpenMetrics format
  HELP                                               this text
  QUIT                                               leave the console
";

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand<'a> {
    /// The whole line, raw; its first word is the rule label.
    Add(&'a [u8]),
    Del(RuleId),
    List,
    Packet(PacketInfo),
    Metrics,
    Help,
    Quit,
}

#[derive(Debug)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Parse one console line. Blank lines yield `None`.
///
/// `ADD` keeps the raw bytes so the rule parser sees exactly what was typed.
pub fn parse_command(line: &[u8]) -> Result<Option<ConsoleCommand<'_>>> {
    let line = line.trim_ascii();
    let text = String::from_utf8_lossy(line);
    let mut words = text.split_whitespace();
    let Some(label) = words.next() else {
        return Ok(None);
    };

    let command = match label.to_ascii_uppercase().as_str() {
        "ADD" => ConsoleCommand::Add(line),
        "DEL" | "DELETE" => {
            let (Some(id), None) = (words.next(), words.next()) else {
                bail!("usage: DEL <id>");
            };
            ConsoleCommand::Del(
                id.parse()
                    .with_context(|| format!("'{id}' is not a rule id"))?,
            )
        }
        "LIST" => ConsoleCommand::List,
        "PACKET" => ConsoleCommand::Packet(parse_packet(&words.collect::<Vec<_>>())?),
        "METRICS" => ConsoleCommand::Metrics,
        "HELP" | "?" => ConsoleCommand::Help,
        "QUIT" | "EXIT" => ConsoleCommand::Quit,
        other => bail!("unknown command '{other}', try HELP"),
    };
    Ok(Some(command))
}

fn parse_packet(args: &[&str]) -> Result<PacketInfo> {
    const USAGE: &str = "usage: PACKET <src> <dst> <proto> [<sport> <dport>]";

    let (src, dst, proto, sport, dport) = match *args {
        [src, dst, proto] => (src, dst, proto, "0", "0"),
        [src, dst, proto, sport, dport] => (src, dst, proto, sport, dport),
        _ => bail!(USAGE),
    };

    let src: Ipv4Addr = src
        .parse()
        .with_context(|| format!("invalid source address '{src}'"))?;
    let dst: Ipv4Addr = dst
        .parse()
        .with_context(|| format!("invalid destination address '{dst}'"))?;
    let protocol = parse_protocol(proto)?;
    let sport: u16 = sport
        .parse()
        .with_context(|| format!("invalid source port '{sport}'"))?;
    let dport: u16 = dport
        .parse()
        .with_context(|| format!("invalid destination port '{dport}'"))?;

    Ok(PacketInfo::ipv4(src, dst, protocol, sport, dport))
}

fn parse_protocol(s: &str) -> Result<Protocol> {
    match s.to_ascii_lowercase().as_str() {
        "icmp" => Ok(Protocol::Icmp),
        "tcp" => Ok(Protocol::Tcp),
        "udp" => Ok(Protocol::Udp),
        n => n
            .parse::<u8>()
            .map(Protocol::from_u8)
            .with_context(|| format!("invalid protocol '{s}': expected icmp|tcp|udp|0-255")),
    }
}

/// Run one parsed command against the runtime.
pub fn execute(rt: &Runtime, command: ConsoleCommand<'_>, output: OutputFormat) -> Result<Reply> {
    let text = match command {
        ConsoleCommand::Add(spec) => {
            let id = rt.firewall.add_rule(spec)?;
            format!("added rule {id}\n")
        }
        ConsoleCommand::Del(id) => {
            if rt.firewall.remove_rule(id) {
                format!("removed rule {id}\n")
            } else {
                format!("no rule with id {id}\n")
            }
        }
        ConsoleCommand::List => match output {
            OutputFormat::Table => render_listing(rt.firewall.as_ref(), rt.list_buffer_size),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(&rt.firewall.snapshot())?;
                json.push('\n');
                json
            }
        },
        ConsoleCommand::Packet(info) => {
            let buffer = rt.pool.acquire()?;
            match rt.pipeline.process(InboundPacket { info, buffer }) {
                Disposition::Admit(packet) => {
                    // Delivered; the stack is done with it.
                    rt.pool.release(packet.buffer);
                    "ADMIT\n".to_string()
                }
                Disposition::Drop => "DROP\n".to_string(),
            }
        }
        ConsoleCommand::Metrics => rt.metrics.encode()?,
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

fn handle_line(rt: &Runtime, line: &[u8], output: OutputFormat) -> Result<Reply> {
    match parse_command(line)? {
        Some(command) => execute(rt, command, output),
        None => Ok(Reply::Text(String::new())),
    }
}

/// Read commands from stdin until EOF, `QUIT` or shutdown, then tear the
/// rule store down.
pub async fn run(rt: Runtime, output: OutputFormat, shutdown: CancellationToken) -> Result<()> {
    run_input(rt, BufReader::new(tokio::io::stdin()), output, shutdown).await
}

/// Console loop over any line source. The rule store is torn down on every
/// exit, including a read error.
async fn run_input<R>(
    rt: Runtime,
    mut input: R,
    output: OutputFormat,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    info!("console ready, type HELP for commands");
    let mut line = Vec::new();

    let result = loop {
        line.clear();
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("shutdown signal received");
                break Ok(());
            }
            read = input.read_until(b'\n', &mut line) => {
                match read {
                    Ok(0) => break Ok(()),
                    Ok(_) => {}
                    Err(e) => break Err(anyhow::Error::new(e).context("failed to read console input")),
                }
                match handle_line(&rt, &line, output) {
                    Ok(Reply::Text(text)) => print!("{text}"),
                    Ok(Reply::Quit) => break Ok(()),
                    Err(e) => {
                        warn!(
                            error = %e,
                            command = %String::from_utf8_lossy(line.trim_ascii()),
                            "console command failed"
                        );
                        println!("error: {e:#}");
                    }
                }
            }
        }
    };

    rt.stop();
    result
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};

    use domain::firewall::error::FirewallError;
    use infrastructure::config::AgentConfig;
    use tokio::io::{AsyncRead, ReadBuf};

    use super::*;

    fn make_runtime() -> Runtime {
        Runtime::start(&AgentConfig::default()).unwrap()
    }

    fn reply(rt: &Runtime, line: &str) -> String {
        match handle_line(rt, line.as_bytes(), OutputFormat::Table).unwrap() {
            Reply::Text(text) => text,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    // ── Parsing ───────────────────────────────────────────────────

    #[test]
    fn blank_line_is_no_command() {
        assert!(parse_command(b"   \r\n").unwrap().is_none());
    }

    #[test]
    fn add_keeps_the_whole_line() {
        assert_eq!(
            parse_command(b"add *-*-*-22-6-0\r\n").unwrap(),
            Some(ConsoleCommand::Add(&b"add *-*-*-22-6-0"[..]))
        );
    }

    #[test]
    fn del_needs_exactly_one_id() {
        assert_eq!(
            parse_command(b"DEL 7").unwrap(),
            Some(ConsoleCommand::Del(RuleId(7)))
        );
        assert!(parse_command(b"DEL").is_err());
        assert!(parse_command(b"DEL 1 2").is_err());
        assert!(parse_command(b"DEL x").is_err());
    }

    #[test]
    fn packet_with_and_without_ports() {
        let Some(ConsoleCommand::Packet(pkt)) =
            parse_command(b"PACKET 10.0.0.2 10.0.0.1 tcp 40000 22").unwrap()
        else {
            panic!("expected packet");
        };
        assert_eq!(pkt.protocol, 6);
        assert_eq!(pkt.dst_port, 22);

        let Some(ConsoleCommand::Packet(pkt)) =
            parse_command(b"packet 10.0.0.2 10.0.0.1 1").unwrap()
        else {
            panic!("expected packet");
        };
        assert_eq!(pkt.protocol, 1);
        assert_eq!(pkt.src_port, 0);
    }

    #[test]
    fn packet_rejects_bad_arguments() {
        assert!(parse_command(b"PACKET 10.0.0.2").is_err());
        assert!(parse_command(b"PACKET 10.0.0.2 10.0.0.1 tcp 1").is_err());
        assert!(parse_command(b"PACKET 10.0.0 10.0.0.1 tcp").is_err());
        assert!(parse_command(b"PACKET 10.0.0.2 10.0.0.1 sctp").is_err());
    }

    #[test]
    fn add_passes_non_ascii_bytes_through() {
        assert_eq!(
            parse_command(b"ADD \xff-*-*-*-*-0").unwrap(),
            Some(ConsoleCommand::Add(&b"ADD \xff-*-*-*-*-0"[..]))
        );
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = parse_command(b"FLUSH").unwrap_err();
        assert!(err.to_string().contains("unknown command"));
    }

    // ── Execution ─────────────────────────────────────────────────

    #[test]
    fn add_list_del_session() {
        let rt = make_runtime();
        assert_eq!(reply(&rt, "ADD *-*-10.0.0.1-*-*-0"), "added rule 1\n");
        assert_eq!(reply(&rt, "ADD 10.0.0.2-*-*-*-*-1"), "added rule 2\n");
        assert_eq!(reply(&rt, "LIST"), "1 *-*-10.0.0.1-*-*-0\n2 10.0.0.2-*-*-*-*-1\n");
        assert_eq!(reply(&rt, "DEL 1"), "removed rule 1\n");
        assert_eq!(reply(&rt, "DEL 1"), "no rule with id 1\n");
        assert_eq!(reply(&rt, "LIST"), "2 10.0.0.2-*-*-*-*-1\n");
        rt.stop();
    }

    #[test]
    fn invalid_rule_is_reported() {
        let rt = make_runtime();
        assert!(handle_line(&rt, b"ADD *-*-*-*-*-*", OutputFormat::Table).is_err());
        assert_eq!(rt.firewall.rule_count(), 0);
        rt.stop();
    }

    #[test]
    fn packet_verdicts_and_buffer_accounting() {
        let rt = make_runtime();
        reply(&rt, "ADD *-*-*-22-6-0");
        assert_eq!(reply(&rt, "PACKET 10.0.0.2 10.0.0.1 tcp 40000 22"), "DROP\n");
        assert_eq!(reply(&rt, "PACKET 10.0.0.2 10.0.0.1 tcp 40000 80"), "ADMIT\n");
        assert_eq!(rt.pool.outstanding(), 0);
        rt.stop();
    }

    #[test]
    fn json_list_is_valid_json() {
        let rt = make_runtime();
        reply(&rt, "ADD *-*-*-22-6-0");
        let Reply::Text(text) =
            execute(&rt, ConsoleCommand::List, OutputFormat::Json).unwrap()
        else {
            panic!("unexpected quit");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["id"], 1);
        assert_eq!(value[0]["dst_port"], 22);
        rt.stop();
    }

    #[test]
    fn metrics_reflect_activity() {
        let rt = make_runtime();
        reply(&rt, "ADD *-*-*-*-*-0");
        reply(&rt, "PACKET 1.2.3.4 5.6.7.8 udp 1 2");
        let text = reply(&rt, "METRICS");
        assert!(text.contains("rulewall_packets_total{action=\"drop\"} 1"));
        assert!(text.contains("rulewall_rules_loaded 1"));
        rt.stop();
    }

    #[test]
    fn non_ascii_rule_is_rejected_not_fatal() {
        let rt = make_runtime();
        let err = handle_line(&rt, b"ADD \xff-*-*-*-*-0", OutputFormat::Table).unwrap_err();
        assert_eq!(
            err.downcast_ref::<FirewallError>(),
            Some(&FirewallError::NotAscii)
        );
        assert_eq!(rt.firewall.rule_count(), 0);
        rt.stop();
    }

    #[test]
    fn quit_ends_the_session() {
        let rt = make_runtime();
        assert!(matches!(
            handle_line(&rt, b"quit", OutputFormat::Table).unwrap(),
            Reply::Quit
        ));
        rt.stop();
    }

    // ── Console loop ──────────────────────────────────────────────

    /// Line source whose every read fails.
    struct FailingInput;

    impl AsyncRead for FailingInput {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("input closed")))
        }
    }

    #[tokio::test]
    async fn session_survives_non_utf8_line_and_stops_on_eof() {
        let rt = make_runtime();
        let firewall = rt.firewall.clone();
        let input: &[u8] = b"ADD \xff-*-*-*-*-0\nADD *-*-*-22-6-0\n";

        run_input(rt, input, OutputFormat::Table, CancellationToken::new())
            .await
            .unwrap();

        assert!(!firewall.is_initialized());
    }

    #[tokio::test]
    async fn quit_stops_the_store() {
        let rt = make_runtime();
        let firewall = rt.firewall.clone();
        let input: &[u8] = b"QUIT\nADD *-*-*-22-6-0\n";

        run_input(rt, input, OutputFormat::Table, CancellationToken::new())
            .await
            .unwrap();

        assert!(!firewall.is_initialized());
    }

    #[tokio::test]
    async fn read_error_still_stops_the_store() {
        let rt = make_runtime();
        let firewall = rt.firewall.clone();

        let err = run_input(
            rt,
            BufReader::new(FailingInput),
            OutputFormat::Table,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("failed to read console input"));
        assert!(!firewall.is_initialized());
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_store() {
        let rt = make_runtime();
        let firewall = rt.firewall.clone();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        run_input(rt, tokio::io::empty(), OutputFormat::Table, shutdown)
            .await
            .unwrap();

        assert!(!firewall.is_initialized());
    }
}
