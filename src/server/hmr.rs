//! Hot-reload event channel
//!
//! Browsers connect over WebSocket and receive JSON events. The client
//! script below is prepended to every entry bundle in development.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServerState;

/// WebSocket route of the event channel
pub const HMR_PATH: &str = "/__mpa_hmr";

/// HMR message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrMessage {
    /// Connection established
    Connected,

    /// Full page reload required
    Reload { reason: String },

    /// Stylesheet re-emitted; links can be refreshed in place
    CssUpdate { path: String },

    /// A watch-mode compile finished cleanly
    Built {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },

    /// A watch-mode compile failed; shown in the browser overlay
    Errors { errors: Vec<String> },
}

/// Browser side of the channel
pub const DEV_CLIENT_SCRIPT: &str = r#"// mpa-builder hot reload client
(function() {
  var overlay = null;

  function showErrors(errors) {
    if (!overlay) {
      overlay = document.createElement('pre');
      overlay.style.cssText = 'position:fixed;top:0;left:0;right:0;bottom:0;margin:0;padding:24px;' +
        'background:rgba(0,0,0,0.85);color:#ff6b6b;font:13px/1.4 monospace;overflow:auto;z-index:2147483647';
      document.body.appendChild(overlay);
    }
    overlay.textContent = errors.join('\n\n');
  }

  function clearErrors() {
    if (overlay) {
      overlay.remove();
      overlay = null;
    }
  }

  function connect() {
    var protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
    var ws = new WebSocket(protocol + '//' + location.host + '/__mpa_hmr');

    ws.onmessage = function(event) {
      var message = JSON.parse(event.data);

      switch (message.type) {
        case 'reload':
          location.reload();
          break;

        case 'css-update':
          document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {
            var url = new URL(link.href);
            url.searchParams.set('t', Date.now());
            link.href = url.toString();
          });
          break;

        case 'built':
          clearErrors();
          break;

        case 'errors':
          showErrors(message.errors);
          break;
      }
    };

    ws.onclose = function() {
      setTimeout(connect, 1000);
    };
  }

  connect();
})();
"#;

/// Handle WebSocket upgrade for HMR
pub async fn hmr_websocket(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(|socket| handle_hmr_socket(socket, state))
}

/// Handle HMR WebSocket connection
async fn handle_hmr_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before greeting so no event slips between the two
    let mut hmr_rx = state.hmr_tx.subscribe();

    if let Ok(json) = serde_json::to_string(&HmrMessage::Connected) {
        let _ = sender.send(Message::Text(json)).await;
    }

    debug!("HMR client connected");

    let send_task = tokio::spawn(async move {
        while let Ok(message) = hmr_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&message) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    debug!("HMR connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&HmrMessage::Reload {
            reason: "index.html emitted".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"reload","reason":"index.html emitted"}"#);

        let json = serde_json::to_string(&HmrMessage::Built { warnings: vec![] }).unwrap();
        assert_eq!(json, r#"{"type":"built"}"#);

        let json = serde_json::to_string(&HmrMessage::Errors {
            errors: vec!["boom".into()],
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"errors","errors":["boom"]}"#);
    }

    #[test]
    fn test_client_uses_channel_path() {
        assert!(DEV_CLIENT_SCRIPT.contains(HMR_PATH));
    }
}
