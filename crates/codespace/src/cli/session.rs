//! Interactive room session over WebSocket.

use codespace_core::{ClientEvent, ClientReplica, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::api::CliResult;
use super::repl::{self, ReplCommand};

/// Join the replica's room and run the line-command loop until `quit` or disconnect.
pub async fn run_session(
    ws_url: Url,
    mut replica: ClientReplica,
    passcode: Option<String>,
) -> CliResult<()> {
    let (mut ws, _) = connect_async(ws_url.as_str()).await?;
    debug!("Connected to {}", ws_url);

    let join = ClientEvent::JoinSpace {
        space_name: replica.space_name().to_string(),
        passcode,
    };
    ws.send(Message::Text(join.to_json())).await?;

    println!("Joined {}. Type 'help' for commands.", replica.space_name());
    println!("{}", repl::tab_bar(&replica));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match ServerEvent::parse(&text) {
                        Ok(event) => {
                            let change = replica.apply(event);
                            if let Some(line) = repl::describe(&change) {
                                println!("{}", line);
                            }
                        }
                        Err(e) => warn!("Ignoring unexpected frame: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        println!("Disconnected from server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }

            line = stdin.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = match ReplCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };

                let outcome = repl::execute(&mut replica, command);
                for line in &outcome.lines {
                    println!("{}", line);
                }
                for event in &outcome.events {
                    ws.send(Message::Text(event.to_json())).await?;
                }
                if outcome.quit {
                    break;
                }
            }
        }
    }

    if let Err(e) = ws.close(None).await {
        debug!("Close handshake failed: {}", e);
    }
    Ok(())
}
