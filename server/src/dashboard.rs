//! Embedded dashboard page served at `/`

pub async fn page() -> axum::response::Html<String> {
    axum::response::Html(DASHBOARD_HTML.to_string())
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>VibeX Dashboard</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        * { box-sizing: border-box; }
        body { font-family: 'SF Mono', 'Fira Code', monospace; background: #0a0e1a; color: #e0e0e0; padding: 20px; margin: 0; }
        h1 { color: #7c5cff; margin-bottom: 4px; }
        h2 { color: #7c5cff; margin: 0 0 12px 0; font-size: 1.1em; }
        .card { background: #111827; border: 1px solid #2a2357; border-radius: 8px; padding: 16px; margin: 10px 0; }
        .metric { display: inline-block; margin: 0 20px 0 0; }
        .metric-value { font-size: 2em; color: #7c5cff; }
        .metric-label { font-size: 0.85em; color: #6b7280; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 8px 10px; text-align: left; border-bottom: 1px solid #2a2357; font-size: 0.9em; }
        th { color: #7c5cff; font-weight: 600; }
        button { background: #2a2357; color: #e0e0e0; border: 1px solid #7c5cff; padding: 8px 20px; cursor: pointer; border-radius: 4px; font-family: inherit; }
        button:hover { background: #7c5cff; color: #0a0e1a; }
        textarea, input, select { background: #111827; color: #e0e0e0; border: 1px solid #2a2357; padding: 10px; border-radius: 4px; width: 100%; font-family: inherit; font-size: 0.95em; }
        textarea:focus, input:focus { outline: none; border-color: #7c5cff; }
        .sse-status { font-size: 0.7em; color: #6b7280; vertical-align: middle; }
        .sse-connected { color: #00ff88; }
        .tabs { display: flex; gap: 0; margin-bottom: 0; }
        .tab { padding: 10px 24px; cursor: pointer; border: 1px solid #2a2357; border-bottom: none; border-radius: 8px 8px 0 0; background: #0d1117; color: #6b7280; }
        .tab.active { background: #111827; color: #7c5cff; border-color: #2a2357; }
        .tab-content { display: none; }
        .tab-content.active { display: block; }
        .board { display: grid; grid-template-columns: repeat(4, 1fr); gap: 10px; }
        .col { background: #0d1117; border: 1px solid #2a2357; border-radius: 6px; padding: 10px; min-height: 200px; }
        .col h3 { color: #7c5cff; font-size: 0.9em; margin: 0 0 8px 0; }
        .col .limit { color: #6b7280; font-weight: normal; }
        .task-card { background: #111827; border: 1px solid #2a2357; border-radius: 4px; padding: 8px; margin: 6px 0; font-size: 0.85em; }
        .task-card .prio-urgent { color: #ff4444; }
        .task-card .prio-high { color: #ffa500; }
        .task-card .prio-medium { color: #00d4ff; }
        .task-card .prio-low { color: #6b7280; }
        .task-card button { padding: 2px 8px; font-size: 0.8em; margin: 2px 2px 0 0; }
        .msg { margin: 8px 0; padding: 10px 14px; border-radius: 8px; line-height: 1.5; }
        .msg-user { background: #2a2357; margin-left: 40px; }
        .msg-ai { background: #1a2332; margin-right: 40px; border: 1px solid #2a2357; }
        .msg-label { font-size: 0.75em; color: #6b7280; margin-bottom: 4px; }
        .msg-content { white-space: pre-wrap; word-wrap: break-word; }
        .event-log { max-height: 260px; overflow-y: auto; font-size: 0.8em; background: #0d1117; border: 1px solid #2a2357; border-radius: 6px; padding: 8px; }
        .event-log div { border-bottom: 1px solid #1a2332; padding: 3px 0; color: #9ca3af; }
        .grid-2 { display: grid; grid-template-columns: 1fr 1fr; gap: 10px; }
        .row { display: flex; gap: 8px; margin: 8px 0; }
        .idea-action { color: #00ff88; }
        .idea-feature { color: #00d4ff; }
        .idea-question { color: #ffa500; }
        @media (max-width: 900px) { .board, .grid-2 { grid-template-columns: 1fr; } }
    </style>
</head>
<body>
    <h1>VibeX <span class="sse-status" id="sse-status">connecting...</span></h1>
    <p style="color:#4b5563;margin-top:0">Tasks, kanban, AI chat, agent memory</p>

    <div class="card">
        <div class="metric"><div class="metric-value" id="m-tasks">-</div><div class="metric-label">Tasks</div></div>
        <div class="metric"><div class="metric-value" id="m-inprogress">-</div><div class="metric-label">In Progress</div></div>
        <div class="metric"><div class="metric-value" id="m-memories">-</div><div class="metric-label">Memories</div></div>
        <div class="metric"><div class="metric-value" id="m-agents">-</div><div class="metric-label">Active Agents</div></div>
        <div class="metric"><div class="metric-value" id="m-uptime">-</div><div class="metric-label">Uptime</div></div>
    </div>

    <div class="tabs">
        <div class="tab active" onclick="switchTab(event, 'board-tab')">Board</div>
        <div class="tab" onclick="switchTab(event, 'chat-tab')">Chat</div>
        <div class="tab" onclick="switchTab(event, 'memory-tab')">Memory</div>
        <div class="tab" onclick="switchTab(event, 'brainstorm-tab')">Brainstorm</div>
        <div class="tab" onclick="switchTab(event, 'agents-tab')">Agents</div>
    </div>

    <!-- BOARD TAB -->
    <div class="card tab-content active" id="board-tab" style="border-radius: 0 8px 8px 8px">
        <div class="row">
            <input id="new-task-title" placeholder="New task title...">
            <select id="new-task-priority" style="max-width:140px">
                <option value="low">low</option>
                <option value="medium" selected>medium</option>
                <option value="high">high</option>
                <option value="urgent">urgent</option>
            </select>
            <button onclick="createTask()">Add</button>
        </div>
        <div class="board" id="board"></div>
    </div>

    <!-- CHAT TAB -->
    <div class="card tab-content" id="chat-tab" style="border-radius: 0 8px 8px 8px">
        <div class="row">
            <label style="color:#6b7280;align-self:center">Provider:</label>
            <select id="chat-provider" style="max-width:220px">
                <option value="">Auto (best available)</option>
                <option value="anthropic">Anthropic</option>
                <option value="openai">OpenAI</option>
                <option value="gemini">Gemini</option>
            </select>
        </div>
        <div id="chat-messages" style="min-height:240px;max-height:400px;overflow-y:auto"></div>
        <div class="row">
            <textarea id="chat-input" rows="2" placeholder="Ask anything..."
                onkeydown="if(event.key==='Enter'&&!event.shiftKey){event.preventDefault();sendChat()}"></textarea>
            <button onclick="sendChat()">Send</button>
        </div>
    </div>

    <!-- MEMORY TAB -->
    <div class="card tab-content" id="memory-tab" style="border-radius: 0 8px 8px 8px">
        <div class="row">
            <input id="memory-query" placeholder="Search agent memory..."
                onkeydown="if(event.key==='Enter'){searchMemory()}">
            <button onclick="searchMemory()">Search</button>
        </div>
        <table><thead><tr><th>Agent</th><th>Key</th><th>Content</th><th>Importance</th><th>Similarity</th></tr></thead>
        <tbody id="memory-table"></tbody></table>
    </div>

    <!-- BRAINSTORM TAB -->
    <div class="card tab-content" id="brainstorm-tab" style="border-radius: 0 8px 8px 8px">
        <div class="grid-2">
            <div>
                <h2>Session</h2>
                <div class="row">
                    <input id="bs-topic" placeholder="Topic...">
                    <button onclick="startBrainstorm()">Start</button>
                </div>
                <div class="row">
                    <textarea id="bs-transcript" rows="3" placeholder="Paste or dictate transcript text..."></textarea>
                    <button onclick="sendTranscript()">Capture</button>
                </div>
                <button onclick="finalizeBrainstorm()">Finalize into tasks</button>
                <span id="bs-status" style="color:#6b7280;margin-left:8px"></span>
            </div>
            <div>
                <h2>Ideas</h2>
                <div id="bs-ideas"></div>
            </div>
        </div>
    </div>

    <!-- AGENTS TAB -->
    <div class="card tab-content" id="agents-tab" style="border-radius: 0 8px 8px 8px">
        <div class="grid-2">
            <div>
                <h2>Registered Agents</h2>
                <table><thead><tr><th>ID</th><th>Type</th><th>Status</th></tr></thead>
                <tbody id="agents-table"></tbody></table>
            </div>
            <div>
                <h2>Live Events</h2>
                <div class="event-log" id="event-log"></div>
            </div>
        </div>
    </div>

    <script>
        function switchTab(ev, tabId) {
            document.querySelectorAll('.tab-content').forEach(el => el.classList.remove('active'));
            document.querySelectorAll('.tab').forEach(el => el.classList.remove('active'));
            document.getElementById(tabId).classList.add('active');
            ev.target.classList.add('active');
        }

        function escapeHtml(text) {
            const div = document.createElement('div');
            div.textContent = text == null ? '' : text;
            return div.innerHTML;
        }

        async function api(path, opts) {
            const res = await fetch(path, opts);
            const body = await res.json();
            if (!body.success) throw new Error(body.error ? body.error.message : 'request failed');
            return body.data;
        }

        // --- Server-sent events ---
        const COLUMNS = ['todo', 'in_progress', 'review', 'completed'];
        let source;
        function connectSSE() {
            source = new EventSource('/api/events');
            source.onopen = () => {
                const el = document.getElementById('sse-status');
                el.textContent = 'live'; el.className = 'sse-status sse-connected';
            };
            source.onerror = () => {
                const el = document.getElementById('sse-status');
                el.textContent = 'disconnected'; el.className = 'sse-status';
            };
            for (const name of ['agent.status.changed', 'task.progress.updated', 'heartbeat']) {
                source.addEventListener(name, ev => logEvent(name, ev.data));
            }
        }
        function logEvent(name, data) {
            const log = document.getElementById('event-log');
            const line = document.createElement('div');
            line.textContent = `${new Date().toLocaleTimeString()} ${name} ${data}`;
            log.prepend(line);
            while (log.children.length > 50) log.removeChild(log.lastChild);
        }
        connectSSE();

        // --- Status tiles ---
        async function refreshStatus() {
            try {
                const s = await api('/api/status');
                document.getElementById('m-tasks').textContent = s.total_tasks;
                document.getElementById('m-inprogress').textContent = s.in_progress_tasks;
                document.getElementById('m-memories').textContent = s.stored_memories;
                document.getElementById('m-agents').textContent = s.active_agents;
                const mins = Math.floor(s.uptime_seconds / 60);
                document.getElementById('m-uptime').textContent = mins >= 60 ? `${Math.floor(mins/60)}h ${mins%60}m` : `${mins}m`;
            } catch (e) { console.error(e); }
        }

        // --- Kanban board ---
        async function refreshBoard() {
            try {
                const board = await api('/api/tasks/kanban');
                const el = document.getElementById('board');
                el.innerHTML = board.columns.map(col => `
                    <div class="col">
                        <h3>${col.column} <span class="limit">${col.count}${col.limit ? '/' + col.limit : ''}</span></h3>
                        ${col.tasks.map(t => taskCard(t, col.column)).join('')}
                    </div>`).join('');
            } catch (e) { console.error(e); }
        }
        function taskCard(t, column) {
            const moves = COLUMNS.filter(c => c !== column)
                .map(c => `<button onclick="moveTask('${t.id}','${c}')">&rarr; ${c}</button>`).join('');
            return `<div class="task-card">
                <div><span class="prio-${t.priority}">&#9679;</span> ${escapeHtml(t.title)}</div>
                <div>${moves}</div>
            </div>`;
        }
        async function createTask() {
            const title = document.getElementById('new-task-title').value.trim();
            if (!title) return;
            const priority = document.getElementById('new-task-priority').value;
            try {
                await api('/api/tasks', { method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify({ title, priority }) });
                document.getElementById('new-task-title').value = '';
                refreshBoard(); refreshStatus();
            } catch (e) { alert(e.message); }
        }
        async function moveTask(id, column) {
            try {
                await api('/api/tasks/kanban/move', { method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify({ task_id: id, column, moved_by: 'dashboard' }) });
                refreshBoard(); refreshStatus();
            } catch (e) { alert(e.message); }
        }

        // --- Chat ---
        async function sendChat() {
            const input = document.getElementById('chat-input');
            const message = input.value.trim();
            if (!message) return;
            input.value = '';
            const box = document.getElementById('chat-messages');
            box.innerHTML += `<div class="msg msg-user"><div class="msg-label">You</div><div class="msg-content">${escapeHtml(message)}</div></div>`;
            box.scrollTop = box.scrollHeight;
            try {
                const provider = document.getElementById('chat-provider').value;
                const data = await api('/api/chat', { method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify({ message, provider }) });
                box.innerHTML += `<div class="msg msg-ai"><div class="msg-label">${escapeHtml(data.provider)} (${escapeHtml(data.model)}, ${data.tokens} tokens)</div><div class="msg-content">${escapeHtml(data.reply)}</div></div>`;
            } catch (e) {
                box.innerHTML += `<div class="msg msg-ai"><div class="msg-label">Error</div><div class="msg-content" style="color:#ff4444">${escapeHtml(e.message)}</div></div>`;
            }
            box.scrollTop = box.scrollHeight;
        }

        // --- Memory ---
        async function searchMemory() {
            const q = document.getElementById('memory-query').value.trim();
            const table = document.getElementById('memory-table');
            try {
                if (q) {
                    const data = await api(`/api/agent-memory/search?q=${encodeURIComponent(q)}`);
                    table.innerHTML = data.results.map(r =>
                        `<tr><td>${escapeHtml(r.agent_type)}</td><td>${escapeHtml(r.context_key)}</td><td>${escapeHtml(r.content.slice(0,80))}</td><td>${r.importance}</td><td>${r.similarity.toFixed(3)}</td></tr>`
                    ).join('');
                } else {
                    const data = await api('/api/agent-memory');
                    table.innerHTML = data.memories.map(m =>
                        `<tr><td>${escapeHtml(m.agent_type)}</td><td>${escapeHtml(m.context_key)}</td><td>${escapeHtml(m.content.slice(0,80))}</td><td>${m.importance}</td><td>-</td></tr>`
                    ).join('');
                }
            } catch (e) { table.innerHTML = `<tr><td colspan="5" style="color:#ff4444">${escapeHtml(e.message)}</td></tr>`; }
        }

        // --- Brainstorm ---
        let sessionId = null;
        async function startBrainstorm() {
            const topic = document.getElementById('bs-topic').value.trim();
            if (!topic) return;
            try {
                const session = await api('/api/brainstorm', { method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify({ topic, created_by: 'dashboard' }) });
                sessionId = session.id;
                document.getElementById('bs-status').textContent = `session ${session.id.slice(0,8)} active`;
                document.getElementById('bs-ideas').innerHTML = '';
            } catch (e) { alert(e.message); }
        }
        async function sendTranscript() {
            if (!sessionId) { alert('start a session first'); return; }
            const text = document.getElementById('bs-transcript').value.trim();
            if (!text) return;
            try {
                await api(`/api/brainstorm/${sessionId}/transcript`, { method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify({ text }) });
                document.getElementById('bs-transcript').value = '';
                const session = await api(`/api/brainstorm/${sessionId}`);
                document.getElementById('bs-ideas').innerHTML = session.ideas.map(i =>
                    `<div class="task-card"><span class="idea-${i.kind}">[${i.kind}]</span> ${escapeHtml(i.text)}</div>`).join('');
            } catch (e) { alert(e.message); }
        }
        async function finalizeBrainstorm() {
            if (!sessionId) return;
            try {
                const data = await api(`/api/brainstorm/${sessionId}/finalize`, { method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify({ user_id: 'dashboard' }) });
                document.getElementById('bs-status').textContent = `${data.created_tasks.length} tasks created`;
                sessionId = null;
                refreshBoard(); refreshStatus();
            } catch (e) { alert(e.message); }
        }

        // --- Agents ---
        async function refreshAgents() {
            try {
                const agents = await api('/api/agents');
                document.getElementById('agents-table').innerHTML = agents.map(a =>
                    `<tr><td>${escapeHtml(a.id.slice(0,8))}</td><td>${escapeHtml(a.agent_type)}</td><td>${escapeHtml(a.status)}</td></tr>`
                ).join('') || '<tr><td colspan="3" style="color:#6b7280">No agents registered</td></tr>';
            } catch (e) { console.error(e); }
        }

        refreshStatus(); refreshBoard(); refreshAgents(); searchMemory();
        setInterval(() => { refreshStatus(); refreshBoard(); refreshAgents(); }, 5000);
    </script>
</body>
</html>"##;
